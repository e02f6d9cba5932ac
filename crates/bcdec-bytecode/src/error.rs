//! Writer errors

use thiserror::Error;

/// Errors that can occur while writing a prototype tree
#[derive(Debug, Error)]
pub enum WriteError {
    /// Serialization failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error during output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for writer operations
pub type Result<T> = std::result::Result<T, WriteError>;
