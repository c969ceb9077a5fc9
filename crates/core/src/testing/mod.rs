//! Testing utilities: a scriptable conversion backend and audio fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use tuneshift_core::testing::MockBackend;
//!
//! let primary = MockBackend::named("primary").unavailable();
//! let fallback = MockBackend::named("fallback").converting(b"ID3");
//!
//! let orchestrator = ConversionOrchestrator::new(vec![
//!     Arc::new(primary.clone()),
//!     Arc::new(fallback.clone()),
//! ]);
//! // ...
//! assert_eq!(fallback.call_count(), 1);
//! ```

mod mock_backend;

pub use mock_backend::{MockBackend, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::f64::consts::PI;
    use std::path::{Path, PathBuf};

    use crate::converter::{encode_wav, DecodedAudio};

    /// Interleaved 16-bit samples of a 440 Hz sine at half amplitude.
    pub fn sine_samples(sample_rate: u32, channels: u16, secs: f64) -> DecodedAudio {
        let frames = (sample_rate as f64 * secs).round() as usize;
        let mut samples = Vec::with_capacity(frames * channels as usize);
        for n in 0..frames {
            let t = n as f64 / sample_rate as f64;
            let value = ((2.0 * PI * 440.0 * t).sin() * i16::MAX as f64 * 0.5) as i16;
            for _ in 0..channels {
                samples.push(value);
            }
        }
        DecodedAudio {
            sample_rate,
            channels,
            samples,
        }
    }

    /// Write a sine tone as a 16-bit PCM WAV file and return its path.
    pub fn write_sine_wav(
        dir: &Path,
        name: &str,
        sample_rate: u32,
        channels: u16,
        secs: f64,
    ) -> PathBuf {
        let audio = sine_samples(sample_rate, channels, secs);
        let bytes = encode_wav(&audio).expect("encode fixture wav");
        let path = dir.join(name);
        std::fs::write(&path, bytes).expect("write fixture wav");
        path
    }
}
