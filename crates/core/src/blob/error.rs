//! Error types for the blob module.

use thiserror::Error;

/// Errors that can occur while storing or reading blobs.
#[derive(Debug, Error)]
pub enum BlobError {
    /// No blob stored under this key.
    #[error("Blob not found: {key}")]
    NotFound { key: String },

    /// Key is empty, absolute, or escapes the storage root.
    #[error("Invalid blob key: {key}")]
    InvalidKey { key: String },

    /// I/O error while accessing storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
