//! In-process encoders for decoded PCM.
//!
//! | format | crate | settings |
//! |---|---|---|
//! | wav | `hound` | 16-bit PCM |
//! | flac | `flacenc` | 4096-sample blocks, as FLAC level 5 |
//! | mp3 | `mp3lame-encoder` | CBR at the registry bitrate |
//! | ogg | `vorbis_rs` | ABR at the registry bitrate |
//!
//! m4a and aac have no in-process encoder.

use std::fmt;
use std::io::Cursor;
use std::num::{NonZeroU32, NonZeroU8};

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::error::Verify;
use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, InterleavedPcm, MonoPcm, Quality};
use vorbis_rs::{VorbisBitrateManagementStrategy, VorbisEncoderBuilder};

use super::error::ConverterError;
use super::types::DecodedAudio;
use crate::format::{FormatParams, TargetFormat};

const BITS_PER_SAMPLE: u16 = 16;

/// Block size of FLAC compression level 5.
const FLAC_BLOCK_SIZE: usize = 4096;

/// Frames handed to the Vorbis encoder per call.
const VORBIS_BLOCK_FRAMES: usize = 4096;

/// Used when the registry leaves the bitrate open.
const DEFAULT_LOSSY_KBPS: u32 = 192;

/// Whether an in-process encoder exists for `format`.
pub fn can_encode(format: TargetFormat) -> bool {
    matches!(
        format,
        TargetFormat::Wav | TargetFormat::Flac | TargetFormat::Mp3 | TargetFormat::Ogg
    )
}

/// Encodes `audio` with the settings in `params`.
pub fn encode(audio: &DecodedAudio, params: &FormatParams) -> Result<Vec<u8>, ConverterError> {
    let bitrate_kbps = params.primary.bitrate_kbps.unwrap_or(DEFAULT_LOSSY_KBPS);
    match params.format {
        TargetFormat::Wav => encode_wav(audio),
        TargetFormat::Flac => encode_flac(audio),
        TargetFormat::Mp3 => encode_mp3(audio, bitrate_kbps),
        TargetFormat::Ogg => encode_ogg(audio, bitrate_kbps),
        other => Err(ConverterError::EncoderUnavailable {
            format: other.to_string(),
        }),
    }
}

/// 16-bit PCM RIFF/WAVE.
pub fn encode_wav(audio: &DecodedAudio) -> Result<Vec<u8>, ConverterError> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer =
        hound::WavWriter::new(&mut cursor, spec).map_err(|e| encoder_error("WAVE", e))?;
    for &sample in &audio.samples {
        writer
            .write_sample(sample)
            .map_err(|e| encoder_error("WAVE", e))?;
    }
    writer.finalize().map_err(|e| encoder_error("WAVE", e))?;

    Ok(cursor.into_inner())
}

fn encode_flac(audio: &DecodedAudio) -> Result<Vec<u8>, ConverterError> {
    let mut config = flacenc::config::Encoder::default();
    config.block_size = FLAC_BLOCK_SIZE;
    let config = config
        .into_verified()
        .map_err(|(_, e)| encoder_error("FLAC", e))?;

    let samples: Vec<i32> = audio.samples.iter().map(|&s| i32::from(s)).collect();
    let source = flacenc::source::MemSource::from_samples(
        &samples,
        audio.channels as usize,
        BITS_PER_SAMPLE as usize,
        audio.sample_rate as usize,
    );

    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| encoder_error("FLAC", e))?;

    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|_| ConverterError::encode_failed("FLAC: failed to serialize stream"))?;

    Ok(sink.as_slice().to_vec())
}

fn lame_bitrate(kbps: u32) -> Bitrate {
    match kbps {
        0..=128 => Bitrate::Kbps128,
        129..=160 => Bitrate::Kbps160,
        161..=192 => Bitrate::Kbps192,
        _ => Bitrate::Kbps320,
    }
}

fn encode_mp3(audio: &DecodedAudio, bitrate_kbps: u32) -> Result<Vec<u8>, ConverterError> {
    // LAME takes mono or stereo only; wider layouts go to the next backend.
    if !(1..=2).contains(&audio.channels) {
        return Err(ConverterError::EncoderUnavailable {
            format: format!("mp3 with {} channels", audio.channels),
        });
    }

    let mut builder = Builder::new().ok_or_else(|| ConverterError::EncoderUnavailable {
        format: "mp3".to_string(),
    })?;
    builder
        .set_num_channels(audio.channels as u8)
        .map_err(|e| encoder_error("MP3", e))?;
    builder
        .set_sample_rate(audio.sample_rate)
        .map_err(|e| encoder_error("MP3", e))?;
    builder
        .set_brate(lame_bitrate(bitrate_kbps))
        .map_err(|e| encoder_error("MP3", e))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| encoder_error("MP3", e))?;
    let mut encoder = builder.build().map_err(|e| encoder_error("MP3", e))?;

    let mut out =
        Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(audio.frames()));
    let encoded = if audio.channels == 1 {
        encoder.encode_to_vec(MonoPcm(&audio.samples), &mut out)
    } else {
        encoder.encode_to_vec(InterleavedPcm(&audio.samples), &mut out)
    };
    encoded.map_err(|e| encoder_error("MP3", e))?;
    encoder
        .flush_to_vec::<FlushNoGap>(&mut out)
        .map_err(|e| encoder_error("MP3", e))?;

    Ok(out)
}

fn encode_ogg(audio: &DecodedAudio, bitrate_kbps: u32) -> Result<Vec<u8>, ConverterError> {
    let channel_count = audio.channels as usize;
    let sample_rate = NonZeroU32::new(audio.sample_rate)
        .ok_or_else(|| ConverterError::encode_failed("Vorbis: zero sample rate"))?;
    let channels = u8::try_from(audio.channels)
        .ok()
        .and_then(NonZeroU8::new)
        .ok_or_else(|| ConverterError::encode_failed("Vorbis: unsupported channel count"))?;
    let average_bitrate = NonZeroU32::new(bitrate_kbps.saturating_mul(1000))
        .ok_or_else(|| ConverterError::encode_failed("Vorbis: zero bitrate"))?;

    let mut out = Vec::new();
    let mut encoder = VorbisEncoderBuilder::new(sample_rate, channels, &mut out)
        .map_err(|e| encoder_error("Vorbis", e))?
        .bitrate_management_strategy(VorbisBitrateManagementStrategy::Abr { average_bitrate })
        .build()
        .map_err(|e| encoder_error("Vorbis", e))?;

    for frames in audio.samples.chunks(VORBIS_BLOCK_FRAMES * channel_count) {
        let mut planar = vec![Vec::with_capacity(frames.len() / channel_count); channel_count];
        for (i, &sample) in frames.iter().enumerate() {
            planar[i % channel_count].push(f32::from(sample) / 32768.0);
        }
        encoder
            .encode_audio_block(&planar)
            .map_err(|e| encoder_error("Vorbis", e))?;
    }
    encoder.finish().map_err(|e| encoder_error("Vorbis", e))?;

    Ok(out)
}

fn encoder_error(codec: &str, e: impl fmt::Debug) -> ConverterError {
    ConverterError::encode_failed(format!("{}: {:?}", codec, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::SymphoniaBackend;
    use crate::format::FormatRegistry;
    use crate::testing::fixtures;
    use tempfile::TempDir;

    /// Encode a tone, write it out and decode it again.
    fn round_trip(target: &str, sample_rate: u32, channels: u16) -> DecodedAudio {
        let audio = fixtures::sine_samples(sample_rate, channels, 0.5);
        let params = FormatRegistry::lookup(target).unwrap();
        let bytes = encode(&audio, &params).unwrap();
        assert!(!bytes.is_empty());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(format!("tone.{}", target));
        std::fs::write(&path, &bytes).unwrap();
        SymphoniaBackend::decode_file(&path).unwrap()
    }

    #[test]
    fn test_can_encode() {
        for format in [TargetFormat::Wav, TargetFormat::Flac, TargetFormat::Mp3, TargetFormat::Ogg] {
            assert!(can_encode(format), "{}", format);
        }
        assert!(!can_encode(TargetFormat::M4a));
        assert!(!can_encode(TargetFormat::Aac));
    }

    #[test]
    fn test_wav_is_lossless() {
        let audio = fixtures::sine_samples(8000, 2, 0.1);
        let bytes = encode_wav(&audio).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, audio.samples);
    }

    #[test]
    fn test_flac_is_lossless() {
        let audio = fixtures::sine_samples(44100, 2, 0.5);
        let decoded = round_trip("flac", 44100, 2);

        assert_eq!(&encode_flac(&audio).unwrap()[0..4], b"fLaC");
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples, audio.samples);
    }

    #[test]
    fn test_mp3_decodes_back() {
        let decoded = round_trip("mp3", 44100, 2);
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.channels, 2);
        // Encoder delay and padding add a few frames.
        assert!(decoded.frames() >= 22050);
    }

    #[test]
    fn test_mp3_mono() {
        let decoded = round_trip("mp3", 44100, 1);
        assert_eq!(decoded.channels, 1);
    }

    #[test]
    fn test_mp3_many_channels_is_unavailable() {
        let audio = fixtures::sine_samples(44100, 6, 0.1);
        let err = encode_mp3(&audio, 192).unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_ogg_decodes_back() {
        let audio = fixtures::sine_samples(44100, 2, 0.5);
        assert_eq!(&encode_ogg(&audio, 192).unwrap()[0..4], b"OggS");

        let decoded = round_trip("ogg", 44100, 2);
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.channels, 2);
        // Block boundaries may pad the tail.
        assert!((decoded.frames() as i64 - 22050).abs() < VORBIS_BLOCK_FRAMES as i64);
    }

    #[test]
    fn test_lame_bitrate_mapping() {
        assert!(matches!(lame_bitrate(192), Bitrate::Kbps192));
        assert!(matches!(lame_bitrate(96), Bitrate::Kbps128));
        assert!(matches!(lame_bitrate(500), Bitrate::Kbps320));
    }

    #[test]
    fn test_aac_has_no_encoder() {
        let audio = fixtures::sine_samples(44100, 2, 0.1);
        let params = FormatRegistry::lookup("aac").unwrap();
        assert!(encode(&audio, &params).unwrap_err().is_unavailable());
    }
}
