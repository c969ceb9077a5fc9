//! FFmpeg-based fallback backend.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tempfile::TempPath;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, Instrument, Span};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::ConversionBackend;
use super::types::BackendOutcome;
use crate::format::{FormatParams, FormatRegistry};

/// Conversion backend that shells out to `ffmpeg`.
///
/// Arguments are passed as a list, never through a shell. Output goes to a
/// temporary file in [`ConverterConfig::temp_dir`] which is removed before
/// `convert` returns, whatever the outcome.
pub struct FfmpegBackend {
    config: ConverterConfig,
    span: Span,
}

impl FfmpegBackend {
    /// Creates a new FFmpeg backend with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            span: tracing::info_span!("backend", name = "ffmpeg"),
        }
    }

    /// Creates a backend with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Routes this backend's diagnostics through `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Builds ffmpeg arguments for one conversion.
    fn build_args(&self, input_path: &Path, output_path: &Path, params: &FormatParams) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-vn".to_string(), // Drop embedded cover art streams
            "-c:a".to_string(),
            params.fallback.codec.to_string(),
        ];

        args.extend(params.fallback.quality.to_ffmpeg_args());

        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(output_path.to_string_lossy().to_string());

        args
    }

    /// Allocates the temp output path for one invocation.
    async fn create_output_path(&self, params: &FormatParams) -> Result<TempPath, ConverterError> {
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;
        let file = tempfile::Builder::new()
            .prefix("tuneshift-")
            .suffix(&format!(".{}", params.container_extension))
            .tempfile_in(&self.config.temp_dir)?;
        Ok(file.into_temp_path())
    }

    async fn run(&self, input_path: &Path, target: &str) -> Result<Vec<u8>, ConverterError> {
        if !self.config.fallback_enabled {
            return Err(ConverterError::BackendDisabled {
                backend: self.name().to_string(),
            });
        }

        if !tokio::fs::try_exists(input_path).await.unwrap_or(false) {
            return Err(ConverterError::InputNotFound {
                path: input_path.to_path_buf(),
            });
        }

        let params = FormatRegistry::fallback_params_or_default(target);

        // Dropping the guard deletes the file, so every early return cleans up
        let output_path = self.create_output_path(&params).await?;
        let args = self.build_args(input_path, &output_path, &params);
        debug!(?args, "Spawning ffmpeg");

        let start = Instant::now();
        let child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            // The child is dropped with the future and killed
            Err(_) => {
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ConverterError::conversion_failed(
                format!("FFmpeg exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }

        let bytes = tokio::fs::read(&output_path).await?;
        output_path.close()?;

        if bytes.is_empty() {
            return Err(ConverterError::EmptyOutput);
        }

        debug!(
            output_bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ffmpeg conversion finished"
        );

        Ok(bytes)
    }

    /// Validates that the ffmpeg executable can be started.
    pub async fn validate(&self) -> Result<(), ConverterError> {
        let result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(ConverterError::conversion_failed(
                format!("ffmpeg -version exited with code: {:?}", output.status.code()),
                None,
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConverterError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                })
            }
            Err(e) => Err(ConverterError::Io(e)),
        }
    }
}

#[async_trait]
impl ConversionBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn convert(&self, input_path: &Path, target: &str) -> BackendOutcome {
        let span = self.span.clone();
        BackendOutcome::from_result(self.run(input_path, target).instrument(span).await)
    }
}
