use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Image decode failed: {0}")]
    ImageError(String),

    #[error("Decode task failed: {0}")]
    TaskFailed(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

impl From<image::ImageError> for MetadataError {
    fn from(err: image::ImageError) -> Self {
        MetadataError::ImageError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
