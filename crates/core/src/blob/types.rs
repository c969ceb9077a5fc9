//! Blob keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

use super::error::BlobError;

/// Namespace for uploaded source files.
pub const ORIGINAL_NAMESPACE: &str = "original";

/// Namespace for conversion output.
pub const CONVERTED_NAMESPACE: &str = "converted";

/// Relative, slash-separated address of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobKey(String);

impl BlobKey {
    /// Validates and wraps a raw key.
    pub fn parse(raw: impl Into<String>) -> Result<Self, BlobError> {
        let raw = raw.into();
        let path = Path::new(&raw);
        let valid = !raw.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if valid {
            Ok(Self(raw))
        } else {
            Err(BlobError::InvalidKey { key: raw })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, the stored filename.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_key() {
        let key = BlobKey::parse("original/abc/song.wav").unwrap();
        assert_eq!(key.as_str(), "original/abc/song.wav");
        assert_eq!(key.file_name(), "song.wav");
    }

    #[test]
    fn test_parse_rejects_escapes() {
        for raw in ["", "/etc/passwd", "../secret", "original/../../x", "./a"] {
            assert!(
                matches!(BlobKey::parse(raw), Err(BlobError::InvalidKey { .. })),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_serde_transparent() {
        let key = BlobKey::parse("converted/x/a.mp3").unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"converted/x/a.mp3\"");
    }
}
