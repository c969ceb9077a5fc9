//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

use crate::format::UnsupportedFormat;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// No in-process encoder is built for this format.
    #[error("No in-process encoder available for format: {format}")]
    EncoderUnavailable { format: String },

    /// Backend switched off in configuration.
    #[error("Backend disabled: {backend}")]
    BackendDisabled { backend: String },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Target format is not in the registry.
    #[error(transparent)]
    UnsupportedFormat(#[from] UnsupportedFormat),

    /// Source audio could not be decoded.
    #[error("Failed to decode input: {reason}")]
    DecodeFailed { reason: String },

    /// Decoded audio could not be encoded.
    #[error("Failed to encode output: {reason}")]
    EncodeFailed { reason: String },

    /// Conversion process failed.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The backend finished but produced no bytes.
    #[error("Conversion produced no output")]
    EmptyOutput,

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new decode failed error.
    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::DecodeFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new encode failed error.
    pub fn encode_failed(reason: impl Into<String>) -> Self {
        Self::EncodeFailed {
            reason: reason.into(),
        }
    }

    /// Whether this error means the backend cannot run in this environment,
    /// as opposed to a defect in this particular conversion.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::FfmpegNotFound { .. } | Self::EncoderUnavailable { .. } | Self::BackendDisabled { .. }
        )
    }
}
