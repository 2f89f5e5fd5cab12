//! Types for the operation module.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::format::{AudioFormat, Bitrate, ChannelSelection};

/// A caller-supplied input file.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Original file name, used for format detection and result naming.
    pub name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Creates a source file.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    /// Lower-cased extension, if any.
    pub fn extension(&self) -> Option<String> {
        match self.name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                Some(ext.to_ascii_lowercase())
            }
            _ => None,
        }
    }

    /// Registry format matching the extension.
    pub fn format(&self) -> Option<AudioFormat> {
        self.extension()
            .and_then(|ext| AudioFormat::from_extension(&ext))
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Noise colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    /// Flat spectrum.
    #[default]
    White,
    /// White noise band-limited to 20 Hz–4 kHz.
    Pink,
}

/// Prepend synthesized noise to a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseRequest {
    #[serde(default, rename = "type")]
    pub noise_type: NoiseColor,
    /// Noise length in seconds.
    pub duration_secs: f64,
    /// Linear amplitude, `(0, 1]`.
    pub amplitude: f64,
    #[serde(default = "default_bitrate")]
    pub bitrate: Bitrate,
}

/// Tag fields. Empty strings mean "absent".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagSet {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub track: String,
    pub genre: String,
}

impl TagSet {
    /// Non-empty fields as engine metadata keys, in a fixed order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("title", self.title.as_str()),
            ("artist", self.artist.as_str()),
            ("album", self.album.as_str()),
            ("date", self.year.as_str()),
            ("track", self.track.as_str()),
            ("genre", self.genre.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect()
    }
}

/// Rewrite tags, optionally replacing the cover image.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetagRequest {
    #[serde(default)]
    pub tags: TagSet,
    /// Replacement cover image bytes.
    #[serde(skip)]
    pub cover: Option<Vec<u8>>,
}

impl fmt::Debug for RetagRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetagRequest")
            .field("tags", &self.tags)
            .field("cover", &self.cover.as_ref().map(Vec::len))
            .finish()
    }
}

/// Transcode to another format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub format: AudioFormat,
    #[serde(default = "default_bitrate")]
    pub bitrate: Bitrate,
    /// Output sample rate in Hz; `None` keeps the source rate.
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub channels: ChannelSelection,
}

/// Cut a time range, optionally stripping silence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimRequest {
    pub start_secs: f64,
    pub end_secs: f64,
    /// Output format; `None` keeps the source format.
    #[serde(default)]
    pub format: Option<AudioFormat>,
    #[serde(default = "default_bitrate")]
    pub bitrate: Bitrate,
    #[serde(default)]
    pub remove_silence: bool,
    #[serde(default = "default_silence_threshold_db")]
    pub silence_threshold_db: f64,
    #[serde(default = "default_silence_duration_secs")]
    pub silence_duration_secs: f64,
}

/// Render a waveform image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveformRequest {
    #[serde(default = "default_waveform_width")]
    pub width: u32,
    #[serde(default = "default_waveform_height")]
    pub height: u32,
    #[serde(default = "default_waveform_color")]
    pub color: String,
}

impl Default for WaveformRequest {
    fn default() -> Self {
        Self {
            width: default_waveform_width(),
            height: default_waveform_height(),
            color: default_waveform_color(),
        }
    }
}

fn default_bitrate() -> Bitrate {
    Bitrate::from_kbps(192)
}

fn default_silence_threshold_db() -> f64 {
    -50.0
}

fn default_silence_duration_secs() -> f64 {
    0.5
}

fn default_waveform_width() -> u32 {
    1200
}

fn default_waveform_height() -> u32 {
    240
}

fn default_waveform_color() -> String {
    "#3b82f6".to_string()
}

/// Operation kind, used for labels and archive names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    AddNoiseAndConcat,
    ExtractCover,
    ReadMetadata,
    RetagAudio,
    ConvertFormat,
    TrimAudio,
    RenderWaveform,
}

impl OperationKind {
    /// Short label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddNoiseAndConcat => "noise",
            Self::ExtractCover => "cover",
            Self::ReadMetadata => "metadata",
            Self::RetagAudio => "retag",
            Self::ConvertFormat => "convert",
            Self::TrimAudio => "trim",
            Self::RenderWaveform => "waveform",
        }
    }

    /// Whether the operation produces a file (and can be batched).
    pub fn produces_file(&self) -> bool {
        !matches!(self, Self::ReadMetadata)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One operation to run against a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationRequest {
    AddNoiseAndConcat(NoiseRequest),
    ExtractCover,
    ReadMetadata,
    RetagAudio(RetagRequest),
    ConvertFormat(ConvertRequest),
    TrimAudio(TrimRequest),
    RenderWaveform(WaveformRequest),
}

impl OperationRequest {
    /// The request's kind.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::AddNoiseAndConcat(_) => OperationKind::AddNoiseAndConcat,
            Self::ExtractCover => OperationKind::ExtractCover,
            Self::ReadMetadata => OperationKind::ReadMetadata,
            Self::RetagAudio(_) => OperationKind::RetagAudio,
            Self::ConvertFormat(_) => OperationKind::ConvertFormat,
            Self::TrimAudio(_) => OperationKind::TrimAudio,
            Self::RenderWaveform(_) => OperationKind::RenderWaveform,
        }
    }
}

/// A produced file handed back to the caller.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl fmt::Debug for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationResult")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Outcome of [`OperationExecutor::execute`](super::OperationExecutor::execute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutput {
    File(OperationResult),
    Metadata(TagSet),
}
