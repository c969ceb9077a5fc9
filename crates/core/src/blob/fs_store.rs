//! File system blob store implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::error::BlobError;
use super::traits::BlobStore;
use super::types::BlobKey;

/// Blob store rooted at a local directory.
///
/// Keys have the shape `<namespace>/<uuid>/<filename>`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reduces a client-supplied filename to a safe single path segment.
    pub fn sanitize_filename(filename: &str) -> String {
        let base = filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();

        let cleaned: String = base
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        let cleaned = cleaned.trim_start_matches('.').to_string();
        if cleaned.is_empty() {
            "file".to_string()
        } else {
            cleaned
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        namespace: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<BlobKey, BlobError> {
        let key = BlobKey::parse(format!(
            "{}/{}/{}",
            namespace,
            uuid::Uuid::new_v4(),
            Self::sanitize_filename(filename)
        ))?;

        let destination = self.path(&key);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write beside the destination and rename, so readers never see a partial blob
        let partial = destination.with_extension("part");
        fs::write(&partial, bytes).await?;
        if let Err(e) = fs::rename(&partial, &destination).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }

        debug!(key = %key, bytes = bytes.len(), "Stored blob");
        Ok(key)
    }

    async fn read(&self, key: &BlobKey) -> Result<Vec<u8>, BlobError> {
        fs::read(self.path(key)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound {
                    key: key.to_string(),
                }
            } else {
                BlobError::Io(e)
            }
        })
    }

    fn path(&self, key: &BlobKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    async fn exists(&self, key: &BlobKey) -> bool {
        fs::try_exists(self.path(key)).await.unwrap_or(false)
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), BlobError> {
        let path = self.path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        // Drop the per-blob directory if it is now empty
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir(parent).await;
        }

        debug!(key = %key, "Deleted blob");
        Ok(())
    }
}
