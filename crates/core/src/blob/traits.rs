//! Trait definitions for the blob module.

use async_trait::async_trait;
use std::path::PathBuf;

use super::error::BlobError;
use super::types::BlobKey;

/// Storage addressable by generated keys.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under a fresh key in `namespace`, keeping `filename`
    /// as the last key segment.
    async fn put(&self, namespace: &str, filename: &str, bytes: &[u8])
        -> Result<BlobKey, BlobError>;

    /// Reads a blob fully into memory.
    async fn read(&self, key: &BlobKey) -> Result<Vec<u8>, BlobError>;

    /// Local filesystem path of a blob, for tools that need a file.
    fn path(&self, key: &BlobKey) -> PathBuf;

    /// Whether a blob exists under `key`.
    async fn exists(&self, key: &BlobKey) -> bool;

    /// Deletes a blob. Deleting a missing blob is not an error.
    async fn delete(&self, key: &BlobKey) -> Result<(), BlobError>;
}
