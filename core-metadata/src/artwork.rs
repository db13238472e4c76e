//! Artwork Cache - Decode, Downscale and Cache Album Art
//!
//! ## Overview
//!
//! `ArtCache` maps an art source reference (a content handle or a local path)
//! to a decoded [`ArtBitmap`]. It owns the decode pipeline:
//!
//! 1. Serve a cached bitmap if one exists for the reference
//! 2. For content handles carrying a thumbnail hint on hosts that can produce
//!    thumbnails, ask the host for one at the thumbnail size and stop there
//! 3. Otherwise read the encoded image through the [`ArtSource`], read its
//!    dimensions, pick a power-of-two subsampling factor for the configured
//!    downscale target and decode at that size
//! 4. Cache the result. Failures and missing art are never cached
//!
//! The cache is bounded by decoded byte size rather than entry count and
//! evicts least-recently-used entries first. Pixel decoding runs on the
//! blocking pool so callers on the async runtime are never stalled by it.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::artwork::{ArtCache, DecodeOptions};
//! use std::sync::Arc;
//!
//! let cache = ArtCache::new(art_source, 32 * 1024 * 1024, DecodeOptions::default());
//! if let Some(bitmap) = cache.get_or_decode("/cache/cover.jpg", None).await {
//!     println!("{}x{}", bitmap.width, bitmap.height);
//! }
//! ```

use std::io::Cursor;
use std::sync::Arc;

use bridge_traits::artwork::{ArtBitmap, ArtSource};
use bridge_traits::session::PlatformCapabilities;
use bytes::Bytes;
use core_runtime::config::{SessionConfig, DEFAULT_THUMBNAIL_SIZE};
use core_runtime::events::{ArtworkEvent, CoreEvent, EventBus};
use core_runtime::logging::strip_path;
use image::imageops::FilterType;
use image::ImageReader;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{MetadataError, Result};

/// Scheme of host content handles.
const CONTENT_SCHEME: &str = "content";

/// How art is loaded and scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Host capability level, gating direct thumbnail loading
    pub capabilities: PlatformCapabilities,
    /// Size requested for host thumbnails
    pub thumbnail_size: (u32, u32),
    /// Downscale target `(width, height)` for decoded art
    pub downscale: Option<(u32, u32)>,
}

impl DecodeOptions {
    /// Derives options from a session configuration.
    pub fn from_config(config: &SessionConfig, capabilities: PlatformCapabilities) -> Self {
        Self {
            capabilities,
            thumbnail_size: config.thumbnail_size(),
            downscale: config.art_downscale(),
        }
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            capabilities: PlatformCapabilities::new(0),
            thumbnail_size: (DEFAULT_THUMBNAIL_SIZE, DEFAULT_THUMBNAIL_SIZE),
            downscale: None,
        }
    }
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
    pub capacity_bytes: usize,
}

struct CacheState {
    entries: LruCache<String, Arc<ArtBitmap>>,
    bytes: usize,
}

/// Bounded, byte-accounted LRU cache of decoded artwork.
pub struct ArtCache {
    source: Arc<dyn ArtSource>,
    state: Mutex<CacheState>,
    capacity_bytes: usize,
    options: DecodeOptions,
    events: Option<EventBus>,
}

impl ArtCache {
    /// Create a new ArtCache
    ///
    /// # Arguments
    ///
    /// * `source` - Where encoded images are read from
    /// * `capacity_bytes` - Maximum decoded bytes held at once
    /// * `options` - Thumbnail and downscale settings
    pub fn new(source: Arc<dyn ArtSource>, capacity_bytes: usize, options: DecodeOptions) -> Self {
        Self {
            source,
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                bytes: 0,
            }),
            capacity_bytes,
            options,
            events: None,
        }
    }

    /// Broadcast cache hits, decodes and evictions on `events`.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Returns the decoded art for `reference`, decoding it on a miss.
    ///
    /// # Arguments
    ///
    /// * `reference` - Content handle or local path, also the cache key
    /// * `thumbnail_hint` - Present when the host should produce a thumbnail
    ///
    /// # Returns
    ///
    /// `None` when the art is missing or cannot be decoded. Nothing is cached
    /// in that case, so a later call tries again.
    pub async fn get_or_decode(
        &self,
        reference: &str,
        thumbnail_hint: Option<&str>,
    ) -> Option<Arc<ArtBitmap>> {
        if let Some(bitmap) = self.get(reference) {
            self.emit(ArtworkEvent::CacheHit {
                art_ref: reference.to_string(),
            });
            return Some(bitmap);
        }

        match self.load(reference, thumbnail_hint).await {
            Ok(Some(bitmap)) => {
                let bitmap = Arc::new(bitmap);
                self.emit(ArtworkEvent::Decoded {
                    art_ref: reference.to_string(),
                    width: bitmap.width,
                    height: bitmap.height,
                    bytes: bitmap.byte_size(),
                });
                self.insert(reference.to_string(), Arc::clone(&bitmap));
                Some(bitmap)
            }
            Ok(None) => {
                debug!(art_ref = strip_path(reference), "No artwork available");
                None
            }
            Err(e) => {
                warn!(art_ref = strip_path(reference), error = %e, "Failed to load artwork");
                self.emit(ArtworkEvent::DecodeFailed {
                    art_ref: reference.to_string(),
                    message: e.to_string(),
                });
                None
            }
        }
    }

    /// Cached art for `reference`, marking it most recently used.
    pub fn get(&self, reference: &str) -> Option<Arc<ArtBitmap>> {
        self.state.lock().entries.get(reference).cloned()
    }

    /// Cached art for `reference` without touching recency.
    pub fn peek(&self, reference: &str) -> Option<Arc<ArtBitmap>> {
        self.state.lock().entries.peek(reference).cloned()
    }

    /// Adds art to the cache, evicting least-recently-used entries until the
    /// total fits the capacity.
    ///
    /// Art larger than the whole capacity is not cached.
    pub fn insert(&self, reference: String, bitmap: Arc<ArtBitmap>) {
        let size = bitmap.byte_size();
        if size > self.capacity_bytes {
            debug!(
                art_ref = strip_path(&reference),
                size,
                capacity = self.capacity_bytes,
                "Artwork exceeds cache capacity, not caching"
            );
            return;
        }

        let mut evicted = Vec::new();
        {
            let mut state = self.state.lock();
            if let Some(previous) = state.entries.pop(&reference) {
                state.bytes -= previous.byte_size();
            }
            while state.bytes + size > self.capacity_bytes {
                match state.entries.pop_lru() {
                    Some((key, old)) => {
                        state.bytes -= old.byte_size();
                        evicted.push((key, old.byte_size()));
                    }
                    None => break,
                }
            }
            state.entries.put(reference.clone(), bitmap);
            state.bytes += size;

            debug!(
                art_ref = strip_path(&reference),
                size,
                total = state.bytes,
                "Added artwork to cache"
            );
        }

        for (art_ref, bytes) in evicted {
            debug!(art_ref = strip_path(&art_ref), bytes, "Evicted artwork from cache");
            self.emit(ArtworkEvent::Evicted { art_ref, bytes });
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            bytes: state.bytes,
            capacity_bytes: self.capacity_bytes,
        }
    }

    /// Drops every cached bitmap.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.bytes = 0;
        info!("Cleared artwork cache");
    }

    async fn load(&self, reference: &str, thumbnail_hint: Option<&str>) -> Result<Option<ArtBitmap>> {
        let content = is_content_reference(reference);

        if content && thumbnail_hint.is_some() && self.options.capabilities.supports_direct_thumbnails() {
            let (width, height) = self.options.thumbnail_size;
            return match self.source.load_thumbnail(reference, width, height).await? {
                Some(encoded) => decode(encoded, None).await.map(Some),
                None => Ok(None),
            };
        }

        match self.source.open(reference).await? {
            Some(encoded) => decode(encoded, self.options.downscale).await.map(Some),
            None => Ok(None),
        }
    }

    fn emit(&self, event: ArtworkEvent) {
        if let Some(bus) = &self.events {
            bus.publish(CoreEvent::Artwork(event));
        }
    }
}

impl std::fmt::Debug for ArtCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtCache")
            .field("stats", &self.stats())
            .field("options", &self.options)
            .finish()
    }
}

/// Whether `reference` is a host content handle rather than a local path.
pub fn is_content_reference(reference: &str) -> bool {
    Url::parse(reference)
        .map(|url| url.scheme() == CONTENT_SCHEME)
        .unwrap_or(false)
}

/// Largest power-of-two subsampling factor that keeps both dimensions at or
/// above the requested size.
///
/// Starting from 1, the factor doubles while halving the image once more would
/// still leave both `height / 2 / factor >= req_height` and
/// `width / 2 / factor >= req_width`. Images already within the requested size
/// are not subsampled.
///
/// # Examples
///
/// ```
/// use core_metadata::artwork::calculate_in_sample_size;
///
/// assert_eq!(calculate_in_sample_size(3000, 4000, 150, 200), 16);
/// assert_eq!(calculate_in_sample_size(100, 100, 192, 192), 1);
/// ```
pub fn calculate_in_sample_size(width: u32, height: u32, req_width: u32, req_height: u32) -> u32 {
    let mut sample_size = 1;
    if height > req_height || width > req_width {
        let half_height = height / 2;
        let half_width = width / 2;
        while half_height / sample_size >= req_height && half_width / sample_size >= req_width {
            sample_size *= 2;
            // A zero target never stops the loop on its own
            if half_height / sample_size == 0 && half_width / sample_size == 0 {
                break;
            }
        }
    }
    sample_size
}

async fn decode(encoded: Bytes, downscale: Option<(u32, u32)>) -> Result<ArtBitmap> {
    tokio::task::spawn_blocking(move || decode_blocking(&encoded, downscale))
        .await
        .map_err(|e| MetadataError::TaskFailed(e.to_string()))?
}

fn decode_blocking(encoded: &[u8], downscale: Option<(u32, u32)>) -> Result<ArtBitmap> {
    let sample_size = match downscale {
        Some((req_width, req_height)) => {
            let (width, height) = ImageReader::new(Cursor::new(encoded))
                .with_guessed_format()
                .map_err(|e| MetadataError::ImageError(e.to_string()))?
                .into_dimensions()?;
            calculate_in_sample_size(width, height, req_width, req_height)
        }
        None => 1,
    };

    let mut image = image::load_from_memory(encoded)?;
    if sample_size > 1 {
        let width = (image.width() / sample_size).max(1);
        let height = (image.height() / sample_size).max(1);
        image = image.resize_exact(width, height, FilterType::Triangle);
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ArtBitmap::new(width, height, Bytes::from(rgba.into_raw())))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use image::{ImageFormat, Rgba, RgbaImage};
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        pub Source {}

        #[async_trait::async_trait]
        impl ArtSource for Source {
            async fn load_thumbnail(&self, uri: &str, width: u32, height: u32) -> bridge_traits::error::Result<Option<Bytes>>;
            async fn open(&self, reference: &str) -> bridge_traits::error::Result<Option<Bytes>>;
        }
    }

    fn png(width: u32, height: u32) -> Bytes {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        Bytes::from(buffer)
    }

    fn bitmap(bytes: usize) -> Arc<ArtBitmap> {
        Arc::new(ArtBitmap::new(1, 1, Bytes::from(vec![0u8; bytes])))
    }

    fn cache_with(source: MockSource, capacity: usize, options: DecodeOptions) -> ArtCache {
        ArtCache::new(Arc::new(source), capacity, options)
    }

    #[test]
    fn test_sample_size_halves_until_just_above_target() {
        assert_eq!(calculate_in_sample_size(3000, 4000, 150, 200), 16);
        assert_eq!(calculate_in_sample_size(1024, 1024, 256, 256), 4);
        assert_eq!(calculate_in_sample_size(1000, 1000, 600, 600), 1);
        assert_eq!(calculate_in_sample_size(100, 100, 192, 192), 1);
    }

    #[test]
    fn test_sample_size_with_unconstrained_height() {
        assert_eq!(calculate_in_sample_size(800, 400, 200, 0), 4);
    }

    #[test]
    fn test_content_reference_detection() {
        assert!(is_content_reference("content://media/external/images/1"));
        assert!(!is_content_reference("/data/cache/cover.jpg"));
        assert!(!is_content_reference("file:///data/cache/cover.jpg"));
        assert!(!is_content_reference("cover.jpg"));
    }

    #[tokio::test]
    async fn test_get_or_decode_is_idempotent() {
        let mut source = MockSource::new();
        source
            .expect_open()
            .with(eq("/covers/a.png"))
            .times(1)
            .returning(|_| Ok(Some(png(4, 4))));
        let cache = cache_with(source, 1024, DecodeOptions::default());

        let first = cache.get_or_decode("/covers/a.png", None).await.unwrap();
        let second = cache.get_or_decode("/covers/a.png", None).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((first.width, first.height), (4, 4));
        assert_eq!(cache.stats().bytes, 4 * 4 * 4);
    }

    #[tokio::test]
    async fn test_missing_art_is_not_cached() {
        let mut source = MockSource::new();
        source.expect_open().times(2).returning(|_| Ok(None));
        let cache = cache_with(source, 1024, DecodeOptions::default());

        assert!(cache.get_or_decode("/covers/missing.png", None).await.is_none());
        assert!(cache.get_or_decode("/covers/missing.png", None).await.is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_decode_failure_yields_none() {
        let mut source = MockSource::new();
        source
            .expect_open()
            .returning(|_| Ok(Some(Bytes::from_static(b"not an image"))));
        let cache = cache_with(source, 1024, DecodeOptions::default());
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let cache = cache.with_event_bus(bus);

        assert!(cache.get_or_decode("/covers/broken.png", None).await.is_none());
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Artwork(ArtworkEvent::DecodeFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_source_error_yields_none() {
        let mut source = MockSource::new();
        source
            .expect_open()
            .returning(|_| Err(BridgeError::OperationFailed("denied".to_string())));
        let cache = cache_with(source, 1024, DecodeOptions::default());

        assert!(cache.get_or_decode("content://media/1", None).await.is_none());
    }

    #[tokio::test]
    async fn test_thumbnail_path_does_not_fall_through() {
        let mut source = MockSource::new();
        source
            .expect_load_thumbnail()
            .with(eq("content://media/art/7"), eq(192), eq(192))
            .times(1)
            .returning(|_, _, _| Ok(None));
        source.expect_open().never();
        let options = DecodeOptions {
            capabilities: PlatformCapabilities::new(29),
            ..DecodeOptions::default()
        };
        let cache = cache_with(source, 1024, options);

        assert!(cache
            .get_or_decode("content://media/art/7", Some("true"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_thumbnail_requested_at_configured_size() {
        let mut source = MockSource::new();
        source
            .expect_load_thumbnail()
            .with(eq("content://media/art/7"), eq(300), eq(192))
            .times(1)
            .returning(|_, _, _| Ok(Some(png(3, 2))));
        let options = DecodeOptions {
            capabilities: PlatformCapabilities::new(34),
            thumbnail_size: (300, 192),
            downscale: None,
        };
        let cache = cache_with(source, 1024, options);

        let art = cache
            .get_or_decode("content://media/art/7", Some("true"))
            .await
            .unwrap();
        assert_eq!((art.width, art.height), (3, 2));
    }

    #[tokio::test]
    async fn test_thumbnail_hint_ignored_on_legacy_hosts() {
        let mut source = MockSource::new();
        source.expect_load_thumbnail().never();
        source
            .expect_open()
            .times(1)
            .returning(|_| Ok(Some(png(2, 2))));
        let options = DecodeOptions {
            capabilities: PlatformCapabilities::new(28),
            ..DecodeOptions::default()
        };
        let cache = cache_with(source, 1024, options);

        assert!(cache
            .get_or_decode("content://media/art/7", Some("true"))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_downscale_subsamples() {
        let mut source = MockSource::new();
        source
            .expect_open()
            .returning(|_| Ok(Some(png(64, 32))));
        let options = DecodeOptions {
            downscale: Some((16, 8)),
            ..DecodeOptions::default()
        };
        let cache = cache_with(source, 64 * 1024, options);

        let art = cache.get_or_decode("/covers/wide.png", None).await.unwrap();
        assert_eq!((art.width, art.height), (16, 8));
    }

    #[test]
    fn test_cache_eviction_respects_budget() {
        let cache = cache_with(MockSource::new(), 1000, DecodeOptions::default());

        cache.insert("id1".to_string(), bitmap(600));
        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.stats().bytes, 600);

        cache.insert("id2".to_string(), bitmap(600));
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.bytes, 600);
        assert!(cache.peek("id1").is_none());
        assert!(cache.peek("id2").is_some());
    }

    #[test]
    fn test_eviction_follows_access_order() {
        let cache = cache_with(MockSource::new(), 300, DecodeOptions::default());
        cache.insert("a".to_string(), bitmap(100));
        cache.insert("b".to_string(), bitmap(100));
        cache.insert("c".to_string(), bitmap(100));

        // Touch "a" so that "b" becomes least recently used
        assert!(cache.get("a").is_some());
        cache.insert("d".to_string(), bitmap(100));

        assert!(cache.peek("a").is_some());
        assert!(cache.peek("b").is_none());
        assert!(cache.peek("c").is_some());
        assert!(cache.peek("d").is_some());
        assert!(cache.stats().bytes <= 300);
    }

    #[test]
    fn test_oversized_art_is_not_cached() {
        let cache = cache_with(MockSource::new(), 100, DecodeOptions::default());
        cache.insert("small".to_string(), bitmap(50));
        cache.insert("huge".to_string(), bitmap(101));

        assert!(cache.peek("huge").is_none());
        assert!(cache.peek("small").is_some());
    }

    #[test]
    fn test_reinsert_replaces_accounting() {
        let cache = cache_with(MockSource::new(), 1000, DecodeOptions::default());
        cache.insert("a".to_string(), bitmap(400));
        cache.insert("a".to_string(), bitmap(200));

        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.stats().bytes, 200);
    }

    #[test]
    fn test_clear_cache() {
        let cache = cache_with(MockSource::new(), 1000, DecodeOptions::default());
        cache.insert("a".to_string(), bitmap(100));
        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.bytes, 0);
    }
}
