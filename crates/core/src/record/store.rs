//! Record storage trait and types.

use thiserror::Error;

use super::AudioRecord;
use crate::blob::BlobKey;
use crate::format::UnsupportedFormat;
use crate::record::ConversionStatus;

/// Error type for record operations.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Record not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Stored version moved on since the caller read the record.
    #[error("Record {id} was modified concurrently: expected version {expected}, found {actual}")]
    Conflict {
        id: String,
        expected: i64,
        actual: i64,
    },

    #[error(transparent)]
    UnsupportedFormat(#[from] UnsupportedFormat),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for RecordError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Request to create a new record.
#[derive(Debug, Clone)]
pub struct CreateRecordRequest {
    pub title: String,
    pub artist: Option<String>,
    /// Filename as uploaded; the original extension is derived from it.
    pub original_name: String,
    pub target_extension: String,
    pub original_key: Option<BlobKey>,
}

/// Filter for querying records.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub status: Option<ConversionStatus>,
    /// Maximum number of results.
    pub limit: i64,
    pub offset: i64,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordFilter {
    pub fn new() -> Self {
        Self {
            status: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: ConversionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for record storage backends.
pub trait RecordStore: Send + Sync {
    /// Create a pending record. Rejects targets the registry does not know.
    fn create(&self, request: CreateRecordRequest) -> Result<AudioRecord, RecordError>;

    fn get(&self, id: &str) -> Result<Option<AudioRecord>, RecordError>;

    /// List records matching the filter, newest upload first.
    fn list(&self, filter: &RecordFilter) -> Result<Vec<AudioRecord>, RecordError>;

    fn count(&self, filter: &RecordFilter) -> Result<i64, RecordError>;

    /// Change the target format. Rejects targets the registry does not know.
    fn set_target(&self, id: &str, target_extension: &str) -> Result<AudioRecord, RecordError>;

    /// Persist the outcome of a conversion attempt in one write.
    ///
    /// Writes status, error message, converted key and converted-at, and
    /// only if the stored version still equals `expected_version`.
    /// Returns the stored record with its bumped version.
    fn save_conversion(
        &self,
        record: &AudioRecord,
        expected_version: i64,
    ) -> Result<AudioRecord, RecordError>;

    /// Delete a record, returning it.
    fn delete(&self, id: &str) -> Result<AudioRecord, RecordError>;
}
