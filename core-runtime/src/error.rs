use thiserror::Error;

/// Errors raised while setting up the runtime: configuration and logging.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A global `tracing` subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    LoggingInstalled(String),
}

pub type Result<T> = std::result::Result<T, Error>;
