//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;

use super::types::BackendOutcome;

/// One mechanism able to turn an audio file into a target format.
///
/// Implementations never return errors across this boundary: every problem
/// is reported as [`BackendOutcome::Unavailable`] or [`BackendOutcome::Failed`].
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// Returns the name of this backend implementation.
    fn name(&self) -> &str;

    /// Converts the file at `input_path` to the format named by `target`.
    async fn convert(&self, input_path: &Path, target: &str) -> BackendOutcome;
}
