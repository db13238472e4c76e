use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Session is not configured")]
    NotConfigured,

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
