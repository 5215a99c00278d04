//! Error types for sigap.

use thiserror::Error;

/// Result type alias using sigap's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for sigap operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed request (missing file, bad request shape)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Identifier failed validation; no store access was performed
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Archive extracted but holds no primary geometry file
    #[error("Invalid archive: {0}")]
    ArchiveInvalid(String),

    /// Archive could not be read or extracted safely
    #[error("Corrupt archive: {0}")]
    ArchiveCorrupt(String),

    /// External geometry import failed, timed out, or could not be launched
    #[error("Load failed: {0}")]
    LoadFailed(String),

    /// Spatial store query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller can fix this by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::InvalidIdentifier(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::QueryFailed(e.to_string())
    }
}
