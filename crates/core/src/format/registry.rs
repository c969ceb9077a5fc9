//! Static lookup table of supported target formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The identifier was not a key of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported target format: '{format}'")]
pub struct UnsupportedFormat {
    pub format: String,
}

/// Supported conversion targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFormat {
    /// MPEG Audio Layer III
    Mp3,
    /// WAVE, 16-bit PCM
    Wav,
    /// Ogg Vorbis
    Ogg,
    /// Free Lossless Audio Codec
    Flac,
    /// AAC in an MPEG-4 container
    M4a,
    /// Alias of `M4a`; same encoder settings.
    Aac,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 6] = [
        Self::Mp3,
        Self::Wav,
        Self::Ogg,
        Self::Flac,
        Self::M4a,
        Self::Aac,
    ];

    /// Identifier as stored on records and used for filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
            Self::M4a => "m4a",
            Self::Aac => "aac",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::Wav => "WAV",
            Self::Ogg => "OGG",
            Self::Flac => "FLAC",
            Self::M4a => "M4A",
            Self::Aac => "AAC",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| UnsupportedFormat {
                format: s.to_string(),
            })
    }
}

/// Settings for the in-process encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryParams {
    /// Target bitrate in kbps for lossy formats; `None` keeps encoder defaults.
    pub bitrate_kbps: Option<u32>,
}

/// Quality knob passed to the external encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackQuality {
    /// Variable bitrate quality level (`-q:a`).
    Vbr(u8),
    /// Lossless compression level (`-compression_level`).
    CompressionLevel(u8),
    /// Constant bitrate in kbps (`-b:a`).
    BitrateKbps(u32),
    /// Encoder defaults.
    Default,
}

impl FallbackQuality {
    /// Renders the quality setting as ffmpeg arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        match self {
            Self::Vbr(level) => vec!["-q:a".to_string(), level.to_string()],
            Self::CompressionLevel(level) => {
                vec!["-compression_level".to_string(), level.to_string()]
            }
            Self::BitrateKbps(kbps) => vec!["-b:a".to_string(), format!("{}k", kbps)],
            Self::Default => Vec::new(),
        }
    }
}

/// Settings for the external command-line encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackParams {
    /// ffmpeg audio codec name.
    pub codec: &'static str,
    pub quality: FallbackQuality,
}

/// Everything the backends need to produce one target format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatParams {
    pub format: TargetFormat,
    /// Extension of the container actually written (the muxer ffmpeg picks).
    pub container_extension: &'static str,
    pub mime_type: &'static str,
    pub lossless: bool,
    pub primary: PrimaryParams,
    pub fallback: FallbackParams,
}

const LOSSY_BITRATE_KBPS: u32 = 192;

const MP3: FormatParams = FormatParams {
    format: TargetFormat::Mp3,
    container_extension: "mp3",
    mime_type: "audio/mpeg",
    lossless: false,
    primary: PrimaryParams {
        bitrate_kbps: Some(LOSSY_BITRATE_KBPS),
    },
    fallback: FallbackParams {
        codec: "libmp3lame",
        quality: FallbackQuality::Vbr(2),
    },
};

const WAV: FormatParams = FormatParams {
    format: TargetFormat::Wav,
    container_extension: "wav",
    mime_type: "audio/wav",
    lossless: true,
    primary: PrimaryParams { bitrate_kbps: None },
    fallback: FallbackParams {
        codec: "pcm_s16le",
        quality: FallbackQuality::Default,
    },
};

const OGG: FormatParams = FormatParams {
    format: TargetFormat::Ogg,
    container_extension: "ogg",
    mime_type: "audio/ogg",
    lossless: false,
    primary: PrimaryParams {
        bitrate_kbps: Some(LOSSY_BITRATE_KBPS),
    },
    fallback: FallbackParams {
        codec: "libvorbis",
        quality: FallbackQuality::Vbr(5),
    },
};

const FLAC: FormatParams = FormatParams {
    format: TargetFormat::Flac,
    container_extension: "flac",
    mime_type: "audio/flac",
    lossless: true,
    primary: PrimaryParams { bitrate_kbps: None },
    fallback: FallbackParams {
        codec: "flac",
        quality: FallbackQuality::CompressionLevel(5),
    },
};

const M4A: FormatParams = FormatParams {
    format: TargetFormat::M4a,
    container_extension: "m4a",
    mime_type: "audio/mp4",
    lossless: false,
    primary: PrimaryParams {
        bitrate_kbps: Some(LOSSY_BITRATE_KBPS),
    },
    fallback: FallbackParams {
        codec: "aac",
        quality: FallbackQuality::BitrateKbps(LOSSY_BITRATE_KBPS),
    },
};

/// Pure lookup table; no state, no side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatRegistry;

impl FormatRegistry {
    /// Parameters for a format.
    pub fn params(format: TargetFormat) -> FormatParams {
        match format {
            TargetFormat::Mp3 => MP3,
            TargetFormat::Wav => WAV,
            TargetFormat::Ogg => OGG,
            TargetFormat::Flac => FLAC,
            TargetFormat::M4a => M4A,
            TargetFormat::Aac => FormatParams {
                format: TargetFormat::Aac,
                ..M4A
            },
        }
    }

    /// Looks up a raw identifier such as `"mp3"`.
    pub fn lookup(identifier: &str) -> Result<FormatParams, UnsupportedFormat> {
        identifier.parse::<TargetFormat>().map(Self::params)
    }

    /// Like [`lookup`](Self::lookup), but unknown identifiers get mp3 settings.
    pub fn fallback_params_or_default(identifier: &str) -> FormatParams {
        Self::lookup(identifier).unwrap_or(MP3)
    }

    /// Whether `identifier` names a supported target.
    pub fn is_supported(identifier: &str) -> bool {
        Self::lookup(identifier).is_ok()
    }

    /// All supported identifiers, in registry order.
    pub fn supported() -> Vec<&'static str> {
        TargetFormat::ALL.iter().map(|f| f.as_str()).collect()
    }
}
