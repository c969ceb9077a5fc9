//! Target format registry.
//!
//! Maps a target format identifier (`mp3`, `wav`, `ogg`, `flac`, `m4a`, `aac`)
//! to the encoding parameters each conversion backend needs.

mod registry;

pub use registry::{
    FallbackParams, FallbackQuality, FormatParams, FormatRegistry, PrimaryParams, TargetFormat,
    UnsupportedFormat,
};
