//! Error types for taskflow-core

use thiserror::Error;

/// Main error type for the taskflow-core library
#[derive(Error, Debug)]
pub enum Error {
    /// A request was rejected before any state changed
    #[error("validation error: {0}")]
    Validation(String),

    /// No task with this id exists
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true for errors the caller can recover from by changing input
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for taskflow-core
pub type Result<T> = std::result::Result<T, Error>;
