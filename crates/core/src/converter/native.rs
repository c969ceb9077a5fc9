//! In-process backend: decode with `symphonia`, encode with built-in encoders.

use async_trait::async_trait;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn, Instrument, Span};

use super::config::ConverterConfig;
use super::encode;
use super::error::ConverterError;
use super::traits::ConversionBackend;
use super::types::{BackendOutcome, DecodedAudio};
use crate::format::{FormatRegistry, TargetFormat};

/// Primary conversion backend.
///
/// Decoding covers everything `symphonia` can read. Encoding uses the
/// encoders linked into this crate (wav, flac, mp3, ogg); other targets
/// report [`BackendOutcome::Unavailable`] so the next backend is tried.
pub struct SymphoniaBackend {
    enabled: bool,
    span: Span,
}

impl Default for SymphoniaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SymphoniaBackend {
    /// Creates an enabled backend.
    pub fn new() -> Self {
        Self {
            enabled: true,
            span: tracing::info_span!("backend", name = "symphonia"),
        }
    }

    /// Creates a backend honouring `primary_enabled`.
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            enabled: config.primary_enabled,
            ..Self::new()
        }
    }

    /// Routes this backend's diagnostics through `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Whether an in-process encoder exists for `format`.
    pub fn can_encode(format: TargetFormat) -> bool {
        encode::can_encode(format)
    }

    /// Decodes the default track of `path` into interleaved 16-bit PCM.
    pub fn decode_file(path: &Path) -> Result<DecodedAudio, ConverterError> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConverterError::InputNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConverterError::Io(e)
            }
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ConverterError::decode_failed(format!("unrecognized audio: {}", e)))?;

        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| ConverterError::decode_failed("no default audio track"))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| ConverterError::decode_failed(format!("unsupported codec: {}", e)))?;

        let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
        let mut channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(0);
        let mut samples: Vec<i16> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(ConverterError::decode_failed(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count() as u16;

                    let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buffer.samples());
                }
                // Corrupt packets are skipped, the rest of the stream may be fine
                Err(SymphoniaError::DecodeError(reason)) => {
                    warn!("Skipping undecodable packet: {}", reason);
                }
                Err(e) => return Err(ConverterError::decode_failed(e.to_string())),
            }
        }

        if samples.is_empty() || channels == 0 || sample_rate == 0 {
            return Err(ConverterError::decode_failed("no audio samples decoded"));
        }

        Ok(DecodedAudio {
            sample_rate,
            channels,
            samples,
        })
    }

    async fn run(&self, input_path: &Path, target: &str) -> Result<Vec<u8>, ConverterError> {
        if !self.enabled {
            return Err(ConverterError::BackendDisabled {
                backend: self.name().to_string(),
            });
        }

        let params = FormatRegistry::lookup(target)?;
        if !Self::can_encode(params.format) {
            return Err(ConverterError::EncoderUnavailable {
                format: params.format.to_string(),
            });
        }

        let path = input_path.to_path_buf();
        let span = Span::current();
        let bytes = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let audio = Self::decode_file(&path)?;
            debug!(
                sample_rate = audio.sample_rate,
                channels = audio.channels,
                duration_secs = audio.duration_secs(),
                bitrate_kbps = ?params.primary.bitrate_kbps,
                "Decoded source audio"
            );
            encode::encode(&audio, &params)
        })
        .await
        .map_err(|e| ConverterError::conversion_failed(format!("decoder task failed: {}", e), None))??;

        Ok(bytes)
    }
}

#[async_trait]
impl ConversionBackend for SymphoniaBackend {
    fn name(&self) -> &str {
        "symphonia"
    }

    async fn convert(&self, input_path: &Path, target: &str) -> BackendOutcome {
        let span = self.span.clone();
        BackendOutcome::from_result(self.run(input_path, target).instrument(span).await)
    }
}
