//! Static format table and capability checks.

use super::error::FormatError;
use super::types::{AudioFormat, Bitrate, ChannelSelection, FormatCapabilities, FormatDescriptor};

const MP3_RATES: &[u32] = &[8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000];
const VORBIS_RATES: &[u32] = &[8000, 11025, 16000, 22050, 32000, 44100, 48000];
const AAC_RATES: &[u32] = &[
    8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000, 64000, 88200, 96000,
];
const PCM_RATES: &[u32] = &[
    8000, 11025, 16000, 22050, 32000, 44100, 48000, 88200, 96000, 176400, 192000,
];
const FLAC_RATES: &[u32] = &[
    8000, 11025, 16000, 22050, 24000, 32000, 44100, 48000, 88200, 96000, 176400, 192000,
];

const MONO_STEREO: &[u8] = &[1, 2];
const AAC_CHANNELS: &[u8] = &[1, 2, 6];

/// libvorbis nominal bitrate (kbps) to `-q:a` quality step.
///
/// Values are fixed tuning constants; keep them literal.
const VORBIS_QUALITY_TABLE: &[(u32, u8)] = &[
    (64, 0),
    (80, 1),
    (96, 2),
    (112, 3),
    (128, 4),
    (160, 5),
    (192, 6),
    (224, 7),
    (256, 8),
    (320, 9),
    (500, 10),
];

/// Returns the static descriptor for a format.
pub fn describe(format: AudioFormat) -> FormatDescriptor {
    let (codec, extension, mime_type, is_lossless) = match format {
        AudioFormat::Mp3 => ("libmp3lame", "mp3", "audio/mpeg", false),
        AudioFormat::Ogg => ("libvorbis", "ogg", "audio/ogg", false),
        AudioFormat::Aac => ("aac", "m4a", "audio/mp4", false),
        AudioFormat::Wav => ("pcm_s16le", "wav", "audio/wav", true),
        AudioFormat::Flac => ("flac", "flac", "audio/flac", true),
        AudioFormat::Aiff => ("pcm_s16be", "aiff", "audio/aiff", true),
    };

    FormatDescriptor {
        format_id: format,
        codec,
        extension,
        mime_type,
        is_lossless,
        supports_cover_art: format != AudioFormat::Wav,
    }
}

/// Resolves a format identifier string and describes it.
pub fn describe_id(format_id: &str) -> Result<FormatDescriptor, FormatError> {
    Ok(describe(format_id.parse()?))
}

/// Returns the sample-rate/channel constraints for a format.
pub fn capabilities(format: AudioFormat) -> FormatCapabilities {
    let (allowed_sample_rates, allowed_channel_counts) = match format {
        AudioFormat::Mp3 => (MP3_RATES, MONO_STEREO),
        AudioFormat::Ogg => (VORBIS_RATES, MONO_STEREO),
        AudioFormat::Aac => (AAC_RATES, AAC_CHANNELS),
        AudioFormat::Wav | AudioFormat::Aiff => (PCM_RATES, MONO_STEREO),
        AudioFormat::Flac => (FLAC_RATES, MONO_STEREO),
    };

    FormatCapabilities {
        format_id: format,
        allowed_sample_rates,
        allowed_channel_counts,
    }
}

impl FormatCapabilities {
    /// Checks a requested sample rate / channel selection against this format.
    ///
    /// `ChannelSelection::Auto` skips the channel check only; `None` keeps the
    /// source sample rate and is always accepted.
    pub fn validate(
        &self,
        sample_rate: Option<u32>,
        channels: ChannelSelection,
    ) -> Result<(), FormatError> {
        if let Some(rate) = sample_rate {
            if !self.allowed_sample_rates.contains(&rate) {
                return Err(FormatError::UnsupportedSampleRate {
                    format: self.format_id,
                    rate,
                    allowed: self.allowed_sample_rates.to_vec(),
                });
            }
        }

        if let ChannelSelection::Count(count) = channels {
            if !self.allowed_channel_counts.contains(&count) {
                return Err(FormatError::UnsupportedChannels {
                    format: self.format_id,
                    channels: count,
                    allowed: self.allowed_channel_counts.to_vec(),
                });
            }
        }

        Ok(())
    }
}

/// Maps a bitrate onto the Vorbis quality scale.
///
/// Exact table hits map directly; other values take the highest step whose
/// nominal bitrate does not exceed the request (never below step 0).
pub fn vorbis_quality(bitrate: Bitrate) -> u8 {
    VORBIS_QUALITY_TABLE
        .iter()
        .take_while(|(kbps, _)| *kbps <= bitrate.kbps())
        .last()
        .map(|(_, quality)| *quality)
        .unwrap_or(0)
}

/// Encoder rate-control arguments for a format.
///
/// Lossless formats never get a bitrate argument; Vorbis is expressed as a
/// quality step; every other lossy format gets an explicit `-b:a`.
pub fn bitrate_args(format: AudioFormat, bitrate: Bitrate) -> Vec<String> {
    let descriptor = describe(format);
    if descriptor.is_lossless {
        return Vec::new();
    }

    match format {
        AudioFormat::Ogg => vec!["-q:a".to_string(), vorbis_quality(bitrate).to_string()],
        _ => vec!["-b:a".to_string(), bitrate.to_string()],
    }
}
