//! Encoder capability detection.

use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

use super::config::ConverterConfig;
use super::native::SymphoniaBackend;
use crate::format::{FormatRegistry, TargetFormat};

/// Which target formats each backend can produce on this machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncoderCapabilities {
    /// `ffmpeg -encoders` ran successfully.
    pub ffmpeg_available: bool,
    /// Formats the in-process backend encodes.
    pub in_process: Vec<TargetFormat>,
    /// Formats whose ffmpeg encoder is compiled into the local ffmpeg.
    pub ffmpeg: Vec<TargetFormat>,
}

impl EncoderCapabilities {
    /// Detect available encoders by probing ffmpeg.
    pub async fn detect(config: &ConverterConfig) -> Self {
        let output = Command::new(&config.ffmpeg_path)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        let stdout = match output {
            Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).to_string(),
            _ => {
                return Self {
                    in_process: Self::in_process_formats(config),
                    ..Self::default()
                }
            }
        };

        Self {
            ffmpeg_available: true,
            in_process: Self::in_process_formats(config),
            ffmpeg: Self::parse_encoders(&stdout),
        }
    }

    fn in_process_formats(config: &ConverterConfig) -> Vec<TargetFormat> {
        if !config.primary_enabled {
            return Vec::new();
        }
        TargetFormat::ALL
            .into_iter()
            .filter(|f| SymphoniaBackend::can_encode(*f))
            .collect()
    }

    /// Parses `ffmpeg -encoders` output into the registry formats it covers.
    ///
    /// Encoder lines look like ` A....D libmp3lame  libmp3lame MP3 ...`; the
    /// second column is the encoder name.
    pub fn parse_encoders(stdout: &str) -> Vec<TargetFormat> {
        let names: Vec<&str> = stdout
            .lines()
            .filter_map(|line| {
                let mut cols = line.split_whitespace();
                let flags = cols.next()?;
                let name = cols.next()?;
                flags.starts_with('A').then_some(name)
            })
            .collect();

        TargetFormat::ALL
            .into_iter()
            .filter(|f| names.contains(&FormatRegistry::params(*f).fallback.codec))
            .collect()
    }

    /// Whether any backend can produce `format`.
    pub fn supports(&self, format: TargetFormat) -> bool {
        self.in_process.contains(&format) || self.ffmpeg.contains(&format)
    }
}
