//! Types shared by the conversion backends.

use super::error::ConverterError;

/// Result of one backend attempt.
#[derive(Debug)]
pub enum BackendOutcome {
    /// Encoded bytes, positioned at the start of the buffer.
    Converted(Vec<u8>),
    /// The backend cannot run in this environment.
    Unavailable(ConverterError),
    /// The backend ran and the conversion failed.
    Failed(ConverterError),
}

impl BackendOutcome {
    /// Sorts a backend result into converted / unavailable / failed.
    pub fn from_result(result: Result<Vec<u8>, ConverterError>) -> Self {
        match result {
            Ok(bytes) => Self::Converted(bytes),
            Err(e) if e.is_unavailable() => Self::Unavailable(e),
            Err(e) => Self::Failed(e),
        }
    }

    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Converted(_) => "converted",
            Self::Unavailable(_) => "unavailable",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Converted(_))
    }

    /// Returns the converted bytes, if any.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Converted(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Interleaved 16-bit PCM produced by the in-process decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples, `channels` per frame.
    pub samples: Vec<i16>,
}

impl DecodedAudio {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        assert!(BackendOutcome::from_result(Ok(vec![1, 2, 3])).is_converted());

        let unavailable = BackendOutcome::from_result(Err(ConverterError::EncoderUnavailable {
            format: "ogg".to_string(),
        }));
        assert_eq!(unavailable.label(), "unavailable");

        let failed = BackendOutcome::from_result(Err(ConverterError::EmptyOutput));
        assert_eq!(failed.label(), "failed");
        assert!(failed.into_bytes().is_none());
    }

    #[test]
    fn test_decoded_audio_frames() {
        let audio = DecodedAudio {
            sample_rate: 8000,
            channels: 2,
            samples: vec![0; 16000],
        };
        assert_eq!(audio.frames(), 8000);
        assert!((audio.duration_secs() - 1.0).abs() < f64::EPSILON);

        let empty = DecodedAudio {
            sample_rate: 0,
            channels: 0,
            samples: Vec::new(),
        };
        assert_eq!(empty.frames(), 0);
        assert_eq!(empty.duration_secs(), 0.0);
    }
}
