//! Error types for term metadata operations.

use thiserror::Error;

use crate::models::RecordId;

/// Result type alias using termeta's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for term metadata operations.
///
/// Absence of data is never an error: a term without a shadow record reads
/// as empty and deletes report `false`. Errors are reserved for failures of
/// the backing store and for invalid input.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A non-database backing store failed
    #[error("Backing store error: {0}")]
    BackingStore(String),

    /// The shadow record disappeared between being ensured and being written
    #[error("Shadow record missing: {0}")]
    ShadowRecordMissing(RecordId),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(e: crate::config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
