use std::time::Duration;

use thiserror::Error;

/// Core error type for Courier operations.
#[derive(Error, Debug)]
pub enum CourierError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Job error: {0}")]
    Job(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Job timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Build a handler failure from any displayable message.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

impl From<serde_json::Error> for CourierError {
    fn from(e: serde_json::Error) -> Self {
        CourierError::Serialization(e.to_string())
    }
}

/// Result type alias using CourierError.
pub type Result<T> = std::result::Result<T, CourierError>;

/// Error returned by job handlers.
pub type HandlerError = CourierError;
