use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Session error: {0}")]
    Session(#[from] core_session::SessionError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
