//! Format registry.
//!
//! A closed table of the output formats the toolkit can produce, with the
//! engine codec, extension, MIME type, losslessness and cover-art support of
//! each, plus the sample-rate/channel combinations every format accepts.
//!
//! # Example
//!
//! ```
//! use audiokit_core::format::{capabilities, describe, AudioFormat, ChannelSelection};
//!
//! let flac = describe(AudioFormat::Flac);
//! assert!(flac.is_lossless);
//!
//! let caps = capabilities(AudioFormat::Mp3);
//! assert!(caps.validate(Some(44100), ChannelSelection::Count(2)).is_ok());
//! assert!(caps.validate(Some(96000), ChannelSelection::Auto).is_err());
//! ```

mod error;
mod registry;
mod types;

pub use error::FormatError;
pub use registry::{bitrate_args, capabilities, describe, describe_id, vorbis_quality};
pub use types::{
    AudioFormat, Bitrate, ChannelSelection, CoverArtMode, FormatCapabilities, FormatDescriptor,
};
