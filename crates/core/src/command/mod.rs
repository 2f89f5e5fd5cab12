//! Engine command construction.
//!
//! One pure builder per operation kind turns a request and its source file
//! into an [`EngineCommand`]: the files to write, the exact argument vector
//! and the virtual output name. Builders validate parameters first and never
//! touch the engine, so argument vectors are unit-testable as plain data.
//!
//! # Example
//!
//! ```
//! use audiokit_core::command::{build_command, CommandScope};
//! use audiokit_core::operation::{OperationRequest, SourceFile};
//!
//! let source = SourceFile::new("song.mp3", vec![1, 2, 3]);
//! let command = build_command(
//!     &source,
//!     &OperationRequest::ExtractCover,
//!     None,
//!     &CommandScope::new("doc"),
//! )
//! .unwrap();
//! assert_eq!(command.inputs[0].name, "doc-input.mp3");
//! assert!(command.args.contains(&"-an".to_string()));
//! ```

mod convert;
mod cover;
mod metadata;
mod noise;
mod trim;
mod types;
mod waveform;

pub use convert::build_convert;
pub use cover::{build_extract_cover, indicates_missing_cover};
pub use metadata::{build_read_metadata, build_retag, parse_ffmetadata, render_ffmetadata};
pub use noise::{build_noise, noise_filter_graph, NOISE_OUTPUT_FORMAT};
pub use trim::{build_trim, db_to_linear, is_passthrough, silence_filter};
pub use types::{CommandScope, EngineCommand, ResultNaming, VirtualFile};
pub use waveform::build_waveform;

use crate::operation::{OperationError, OperationRequest, SourceFile};

/// Builds the command for any request.
///
/// `source_cover` is the cover discovered in the source beforehand, used by
/// targets that embed pictures as a comment.
pub fn build_command<'a>(
    source: &'a SourceFile,
    request: &'a OperationRequest,
    source_cover: Option<&'a [u8]>,
    scope: &CommandScope,
) -> Result<EngineCommand<'a>, OperationError> {
    match request {
        OperationRequest::AddNoiseAndConcat(noise) => build_noise(source, noise, scope),
        OperationRequest::ExtractCover => Ok(build_extract_cover(source, scope)),
        OperationRequest::ReadMetadata => Ok(build_read_metadata(source, scope)),
        OperationRequest::RetagAudio(retag) => build_retag(source, retag, source_cover, scope),
        OperationRequest::ConvertFormat(convert) => {
            build_convert(source, convert, source_cover, scope)
        }
        OperationRequest::TrimAudio(trim) => build_trim(source, trim, source_cover, scope),
        OperationRequest::RenderWaveform(waveform) => build_waveform(source, waveform, scope),
    }
}
