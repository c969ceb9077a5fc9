//! Audio record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::blob::BlobKey;

/// Target used when an upload does not name one.
pub const DEFAULT_TARGET_EXTENSION: &str = "mp3";

/// Conversion state of a record.
///
/// Starts at `Pending`; a conversion attempt moves it to `Success` or
/// `Failed`. Nothing moves a record back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown conversion status: {}", other)),
        }
    }
}

/// One uploaded audio asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRecord {
    /// Assigned by the store on creation.
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    /// Filename as uploaded. Set once at creation.
    pub original_name: String,
    /// Lower-cased extension of `original_name`, or `"unknown"`. Set once at creation.
    pub original_extension: String,
    pub target_extension: String,
    pub original_key: Option<BlobKey>,
    /// Present only after a successful conversion.
    pub converted_key: Option<BlobKey>,
    pub status: ConversionStatus,
    /// Non-empty only when `status` is `Failed`.
    pub error_message: String,
    pub uploaded_at: DateTime<Utc>,
    /// Present only when `status` is `Success`.
    pub converted_at: Option<DateTime<Utc>>,
    /// Bumped by every write; used for conditional updates.
    pub version: i64,
}

impl AudioRecord {
    /// `"title - artist"`, or just the title.
    pub fn display_name(&self) -> String {
        match self.artist.as_deref() {
            Some(artist) if !artist.is_empty() => format!("{} - {}", self.title, artist),
            _ => self.title.clone(),
        }
    }

    /// Basename of the original upload.
    pub fn filename(&self) -> &str {
        self.original_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.original_name)
    }

    /// Original basename with its extension replaced by the target extension.
    pub fn converted_filename(&self) -> String {
        let name = self.filename();
        let stem = match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        };
        format!("{}.{}", stem, self.target_extension)
    }

    pub fn is_converted(&self) -> bool {
        self.status == ConversionStatus::Success && self.converted_key.is_some()
    }
}

/// Lower-cased extension of a filename, or `"unknown"` when it has none.
pub fn extension_of(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < base.len() => base[idx + 1..].to_lowercase(),
        _ => "unknown".to_string(),
    }
}
