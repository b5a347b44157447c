//! Server error type

use thiserror::Error;

use crate::environment::EnvironmentId;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Core(#[from] spaceblock::core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid chunk data encoding: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported ship document version {0}")]
    UnsupportedVersion(u32),

    #[error("ship document lists chunk {0:?} more than once")]
    DuplicateChunk([i32; 3]),

    #[error("environment {0} does not exist")]
    UnknownEnvironment(EnvironmentId),

    #[error("environment {0} is not a ship")]
    NotAShip(EnvironmentId),
}

pub type Result<T> = std::result::Result<T, ServerError>;
