//! Converter module for transcoding uploaded audio.
//!
//! Conversion is attempted by an ordered list of backends:
//!
//! 1. [`SymphoniaBackend`] decodes in-process with `symphonia` and encodes
//!    wav, flac, mp3 and ogg with the encoders linked into this crate.
//! 2. [`FfmpegBackend`] spawns the `ffmpeg` executable with explicit
//!    per-format encoder arguments.
//!
//! [`ConversionOrchestrator`] walks the list strictly in sequence and returns
//! the first converted payload. Each backend reports a [`BackendOutcome`]
//! instead of raising, so "not installed here" ([`BackendOutcome::Unavailable`])
//! and "tried and failed" ([`BackendOutcome::Failed`]) are both plain values.
//!
//! # Example
//!
//! ```ignore
//! use tuneshift_core::converter::{ConversionOrchestrator, ConverterConfig};
//!
//! let orchestrator = ConversionOrchestrator::from_config(&ConverterConfig::default());
//! match orchestrator.convert(Path::new("/uploads/song.wav"), "mp3").await {
//!     Some(bytes) => println!("converted {} bytes", bytes.len()),
//!     None => println!("no backend could convert the file"),
//! }
//! ```

mod capabilities;
mod config;
mod encode;
mod error;
mod ffmpeg;
mod native;
mod orchestrator;
mod traits;
mod types;

pub use capabilities::EncoderCapabilities;
pub use config::ConverterConfig;
pub use encode::encode_wav;
pub use error::ConverterError;
pub use ffmpeg::FfmpegBackend;
pub use native::SymphoniaBackend;
pub use orchestrator::ConversionOrchestrator;
pub use traits::ConversionBackend;
pub use types::{BackendOutcome, DecodedAudio};
