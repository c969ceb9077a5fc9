//! Record lifecycle manager.

use chrono::{SubsecRound, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn, Instrument};

use crate::blob::{BlobError, BlobKey, BlobStore, CONVERTED_NAMESPACE};
use crate::converter::ConversionOrchestrator;
use crate::format::FormatRegistry;
use crate::metrics::RECORD_CONVERSIONS;
use crate::record::{AudioRecord, ConversionStatus, RecordError, RecordStore};

/// Faults that end an attempt outside the expected rejection paths.
#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// How an attempt ended before it was persisted.
enum Attempt {
    Converted(BlobKey),
    Rejected(String),
}

/// Drives conversion attempts and persists their outcome.
pub struct ConversionManager {
    orchestrator: Arc<ConversionOrchestrator>,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
}

impl ConversionManager {
    pub fn new(
        orchestrator: Arc<ConversionOrchestrator>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            orchestrator,
            records,
            blobs,
        }
    }

    /// Converts the record's original file to its target format.
    ///
    /// Returns `true` on success. Never fails: every fault becomes a `failed`
    /// record with a readable message. On return `record` mirrors what is
    /// stored, including a newer state written by a concurrent attempt.
    pub async fn attempt_conversion(&self, record: &mut AudioRecord) -> bool {
        let span = tracing::info_span!(
            "attempt_conversion",
            record_id = %record.id,
            format = %record.target_extension
        );
        self.attempt(record).instrument(span).await
    }

    async fn attempt(&self, record: &mut AudioRecord) -> bool {
        let expected_version = record.version;
        let previous_key = record.converted_key.clone();

        let next = match AssertUnwindSafe(self.run(record)).catch_unwind().await {
            Ok(Ok(Attempt::Converted(key))) => succeeded(record, key),
            Ok(Ok(Attempt::Rejected(message))) => failed(record, message),
            Ok(Err(e)) => {
                error!(error = %e, "Unexpected error during conversion");
                failed(record, format!("Conversion error: {}", e))
            }
            Err(panic) => {
                error!(panic = %panic_message(panic.as_ref()), "Conversion panicked");
                failed(record, "Conversion error: internal fault".to_string())
            }
        };

        match self.records.save_conversion(&next, expected_version) {
            Ok(saved) => {
                *record = saved;
                if previous_key.is_some() && previous_key != record.converted_key {
                    self.discard(previous_key.as_ref()).await;
                }
                let success = record.status == ConversionStatus::Success;
                if success {
                    info!("Record converted");
                } else {
                    warn!(reason = %record.error_message, "Record conversion failed");
                }
                RECORD_CONVERSIONS
                    .with_label_values(&[record.status.as_str()])
                    .inc();
                success
            }
            Err(RecordError::Conflict {
                expected, actual, ..
            }) => {
                warn!(expected, actual, "Record changed during conversion, keeping stored state");
                self.discard(next.converted_key.as_ref()).await;
                match self.records.get(&record.id) {
                    Ok(Some(current)) => *record = current,
                    Ok(None) => *record = next,
                    Err(e) => {
                        warn!(error = %e, "Failed to reload record after conflict");
                        *record = next;
                    }
                }
                RECORD_CONVERSIONS.with_label_values(&["conflict"]).inc();
                false
            }
            Err(e) => {
                error!(error = %e, "Failed to persist conversion outcome");
                self.discard(next.converted_key.as_ref()).await;
                let fallback = failed(record, format!("Conversion error: {}", e));
                *record = match self.records.save_conversion(&fallback, expected_version) {
                    Ok(saved) => {
                        if previous_key.is_some() && previous_key != saved.converted_key {
                            self.discard(previous_key.as_ref()).await;
                        }
                        saved
                    }
                    Err(e) => {
                        debug!(error = %e, "Failed-state write also failed");
                        fallback
                    }
                };
                RECORD_CONVERSIONS.with_label_values(&["failed"]).inc();
                false
            }
        }
    }

    /// Validates inputs, converts, and stores the converted bytes.
    async fn run(&self, record: &AudioRecord) -> Result<Attempt, AttemptError> {
        let params = match FormatRegistry::lookup(&record.target_extension) {
            Ok(params) => params,
            Err(_) => {
                return Ok(Attempt::Rejected(format!(
                    "Conversion failed: unsupported or missing target format '{}'",
                    record.target_extension
                )))
            }
        };

        let original = match &record.original_key {
            Some(key) if self.blobs.exists(key).await => key,
            _ => {
                return Ok(Attempt::Rejected(
                    "Conversion failed: missing original file".to_string(),
                ))
            }
        };

        let input_path = self.blobs.path(original);
        debug!(input = %input_path.display(), "Starting conversion");

        let Some(bytes) = self
            .orchestrator
            .convert(&input_path, params.format.as_str())
            .await
        else {
            return Ok(Attempt::Rejected(
                "Conversion failed: No data returned".to_string(),
            ));
        };

        let key = self
            .blobs
            .put(CONVERTED_NAMESPACE, &record.converted_filename(), &bytes)
            .await?;
        Ok(Attempt::Converted(key))
    }

    async fn discard(&self, key: Option<&BlobKey>) {
        if let Some(key) = key {
            if let Err(e) = self.blobs.delete(key).await {
                warn!(key = %key, error = %e, "Failed to remove converted blob");
            }
        }
    }
}

fn succeeded(record: &AudioRecord, key: BlobKey) -> AudioRecord {
    AudioRecord {
        status: ConversionStatus::Success,
        error_message: String::new(),
        converted_key: Some(key),
        converted_at: Some(Utc::now().trunc_subsecs(6)),
        ..record.clone()
    }
}

fn failed(record: &AudioRecord, message: String) -> AudioRecord {
    AudioRecord {
        status: ConversionStatus::Failed,
        error_message: message,
        converted_key: None,
        converted_at: None,
        ..record.clone()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl std::fmt::Debug for ConversionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionManager")
            .field("backends", &self.orchestrator.backend_names())
            .finish_non_exhaustive()
    }
}
