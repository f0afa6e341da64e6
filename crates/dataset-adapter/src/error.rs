//! Error types for archive access.

use thiserror::Error;

/// Errors raised while opening or reading an archive.
///
/// Only produced by the adapter itself; once an archive is open, metadata
/// accessors are total and absence is represented with `Option`.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The archive (or a member of it) does not exist.
    #[error("archive not found: {0}")]
    NotFound(String),

    /// The location exists but is not a readable Zarr v2/v3 store.
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// The storage backend refused access (credentials, endpoint).
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The archive is structurally damaged or a read returned garbage.
    #[error("corrupt archive: {0}")]
    Corrupt(String),
}

impl AdapterError {
    /// Create a NotFound error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an UnsupportedFormat error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create an AccessDenied error.
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    /// Create a Corrupt error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied(err.to_string()),
            _ => Self::Corrupt(err.to_string()),
        }
    }
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
