//! Error types for the format registry.

use thiserror::Error;

use super::types::AudioFormat;

/// Errors raised while resolving formats or validating output parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The identifier does not name a supported output format.
    #[error("Unknown output format: {0}")]
    UnknownFormat(String),

    /// Requested sample rate is not accepted by the target format.
    #[error("{format} does not support a sample rate of {rate} Hz (allowed: {})", join(.allowed))]
    UnsupportedSampleRate {
        format: AudioFormat,
        rate: u32,
        allowed: Vec<u32>,
    },

    /// Requested channel count is not accepted by the target format.
    #[error("{format} does not support {channels} channel(s) (allowed: {})", join(.allowed))]
    UnsupportedChannels {
        format: AudioFormat,
        channels: u8,
        allowed: Vec<u8>,
    },

    /// Bitrate string could not be parsed.
    #[error("Invalid bitrate: {0:?} (expected e.g. \"192k\")")]
    InvalidBitrate(String),
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
