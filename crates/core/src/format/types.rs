//! Types for the format registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::FormatError;

/// Output audio format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG Audio Layer III
    Mp3,
    /// Ogg Vorbis
    Ogg,
    /// Advanced Audio Coding in an MP4 container
    Aac,
    /// WAVE (uncompressed PCM)
    Wav,
    /// Free Lossless Audio Codec
    Flac,
    /// Audio Interchange File Format (big-endian PCM)
    Aiff,
}

impl AudioFormat {
    /// Every supported output format, in registry order.
    pub const ALL: [AudioFormat; 6] = [
        Self::Mp3,
        Self::Ogg,
        Self::Aac,
        Self::Wav,
        Self::Flac,
        Self::Aiff,
    ];

    /// Stable identifier used in requests and logs.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Aac => "aac",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Aiff => "aiff",
        }
    }

    /// Resolves a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "ogg" | "oga" => Some(Self::Ogg),
            "m4a" | "aac" | "mp4" => Some(Self::Aac),
            "wav" | "wave" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "aif" | "aiff" => Some(Self::Aiff),
            _ => None,
        }
    }

    /// Resolves a format from a filename's extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        filename
            .rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }

    /// How this format carries cover art through the engine.
    pub fn cover_art_mode(&self) -> CoverArtMode {
        match self {
            Self::Mp3 | Self::Aac | Self::Flac | Self::Aiff => CoverArtMode::AttachedPicture,
            Self::Ogg => CoverArtMode::PictureComment,
            Self::Wav => CoverArtMode::Unsupported,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AudioFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FormatError::UnknownFormat(s.to_string()))
    }
}

/// Mechanism used to embed cover art for a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverArtMode {
    /// Image stream mapped into the container with the `attached_pic` disposition.
    AttachedPicture,
    /// Base64 picture block written as a single text tag.
    PictureComment,
    /// No tagging container; images are dropped.
    Unsupported,
}

/// Static description of an output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    /// Format identifier.
    pub format_id: AudioFormat,
    /// Engine encoder name.
    pub codec: &'static str,
    /// File extension (without dot).
    pub extension: &'static str,
    /// MIME type of produced files.
    pub mime_type: &'static str,
    /// Whether the codec is lossless. Lossless formats never take a bitrate.
    pub is_lossless: bool,
    /// Whether cover art survives in this format.
    pub supports_cover_art: bool,
}

/// Sample-rate and channel constraints of an output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatCapabilities {
    /// Format identifier.
    pub format_id: AudioFormat,
    /// Accepted output sample rates in Hz. Never empty.
    pub allowed_sample_rates: &'static [u32],
    /// Accepted output channel counts.
    pub allowed_channel_counts: &'static [u8],
}

/// Requested output channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ChannelRepr", into = "ChannelRepr")]
pub enum ChannelSelection {
    /// Keep whatever the source has; skips channel validation.
    #[default]
    Auto,
    /// Force a channel count.
    Count(u8),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChannelRepr {
    Count(u8),
    Keyword(String),
}

impl TryFrom<ChannelRepr> for ChannelSelection {
    type Error = String;

    fn try_from(value: ChannelRepr) -> Result<Self, Self::Error> {
        match value {
            ChannelRepr::Count(n) => Ok(Self::Count(n)),
            ChannelRepr::Keyword(k) if k.eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            ChannelRepr::Keyword(k) => match k.parse::<u8>() {
                Ok(n) => Ok(Self::Count(n)),
                Err(_) => Err(format!("invalid channel selection: {}", k)),
            },
        }
    }
}

impl From<ChannelSelection> for ChannelRepr {
    fn from(value: ChannelSelection) -> Self {
        match value {
            ChannelSelection::Auto => Self::Keyword("auto".to_string()),
            ChannelSelection::Count(n) => Self::Count(n),
        }
    }
}

/// Audio bitrate in kilobits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bitrate {
    kbps: u32,
}

impl Bitrate {
    /// Creates a bitrate from a kbps value.
    pub fn from_kbps(kbps: u32) -> Self {
        Self { kbps }
    }

    /// Bitrate in kbps.
    pub fn kbps(&self) -> u32 {
        self.kbps
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}k", self.kbps)
    }
}

impl FromStr for Bitrate {
    type Err = FormatError;

    /// Accepts `"192k"`, `"192K"` or `"192"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix('k')
            .or_else(|| trimmed.strip_suffix('K'))
            .unwrap_or(trimmed);

        match digits.parse::<u32>() {
            Ok(kbps) if kbps > 0 && !digits.starts_with('+') => Ok(Self { kbps }),
            _ => Err(FormatError::InvalidBitrate(s.to_string())),
        }
    }
}

impl TryFrom<String> for Bitrate {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bitrate> for String {
    fn from(value: Bitrate) -> Self {
        value.to_string()
    }
}
