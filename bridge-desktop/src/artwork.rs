//! Artwork source backed by the local filesystem.

use async_trait::async_trait;
use bridge_traits::{
    artwork::ArtSource,
    error::{BridgeError, Result},
};
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;
use url::Url;

/// Reads cover images from disk with `tokio::fs`.
///
/// Accepts plain paths and `file://` URIs. Desktop hosts have no content
/// provider, so content handles and thumbnails always come back empty.
#[derive(Debug, Clone, Default)]
pub struct TokioArtSource {
    root: Option<PathBuf>,
}

impl TokioArtSource {
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Resolve relative references against `root`.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root: Some(root) }
    }

    fn resolve(&self, reference: &str) -> Result<Option<PathBuf>> {
        if let Ok(url) = Url::parse(reference) {
            return match url.scheme() {
                "file" => url.to_file_path().map(Some).map_err(|_| {
                    BridgeError::OperationFailed(format!("Invalid file URI: {reference}"))
                }),
                // Single letters are Windows drive prefixes, not schemes
                scheme if scheme.len() == 1 => Ok(Some(PathBuf::from(reference))),
                _ => Ok(None),
            };
        }

        let path = PathBuf::from(reference);
        match &self.root {
            Some(root) if path.is_relative() => Ok(Some(root.join(path))),
            _ => Ok(Some(path)),
        }
    }
}

#[async_trait]
impl ArtSource for TokioArtSource {
    async fn load_thumbnail(&self, uri: &str, _width: u32, _height: u32) -> Result<Option<Bytes>> {
        debug!(uri, "Thumbnail requested on a host without a content provider");
        Ok(None)
    }

    async fn open(&self, reference: &str) -> Result<Option<Bytes>> {
        let Some(path) = self.resolve(reference)? else {
            debug!(reference, "Unsupported art reference scheme");
            return Ok(None);
        };

        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?path, "Art file not found");
                Ok(None)
            }
            Err(e) => Err(BridgeError::Io(e)),
        }
    }
}
