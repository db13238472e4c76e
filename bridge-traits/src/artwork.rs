//! Artwork Source Abstraction
//!
//! Gives the core read access to image bytes addressed by either a host
//! content handle or a local file path.

use bytes::Bytes;

use crate::{error::Result, platform::PlatformSendSync};

/// Decoded RGBA image ready to hand to a notification or session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtBitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Bytes,
}

impl ArtBitmap {
    pub fn new(width: u32, height: u32, rgba: Bytes) -> Self {
        Self {
            width,
            height,
            rgba,
        }
    }

    /// Memory held by the pixel buffer.
    pub fn byte_size(&self) -> usize {
        self.rgba.len()
    }
}

/// Artwork source trait
///
/// - **Android**: `ContentResolver` (thumbnails, file descriptors)
/// - **Desktop**: local filesystem
///
/// # Example
///
/// ```ignore
/// use bridge_traits::artwork::ArtSource;
///
/// async fn read_cover(source: &dyn ArtSource) -> Option<bytes::Bytes> {
///     source.open("/music/covers/album.jpg").await.ok().flatten()
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait ArtSource: PlatformSendSync {
    /// Ask the host for a ready-made thumbnail of a content handle.
    ///
    /// Returns `Ok(None)` when the host has no thumbnail for the handle.
    /// The returned bytes are an encoded image.
    async fn load_thumbnail(&self, uri: &str, width: u32, height: u32) -> Result<Option<Bytes>>;

    /// Read the encoded image behind a content handle or local path.
    async fn open(&self, reference: &str) -> Result<Option<Bytes>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_tracks_buffer() {
        let bitmap = ArtBitmap::new(2, 2, Bytes::from(vec![0u8; 16]));
        assert_eq!(bitmap.byte_size(), 16);
    }
}
