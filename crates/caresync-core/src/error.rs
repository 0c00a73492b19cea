//! Error types for caresync-core

use thiserror::Error;

/// Result type alias using caresync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in caresync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored queue could not be decoded; left untouched
    #[error("Stored queue under '{key}' is corrupt: {reason}")]
    CorruptQueue {
        /// Storage key holding the queue
        key: String,
        /// Decoder message
        reason: String,
    },
}
