//! Cover-art extraction.

use super::types::{push_all, CommandScope, EngineCommand, ResultNaming, VirtualFile};
use crate::operation::SourceFile;
use crate::progress::LogTail;

/// Engine log fragments meaning the input had no image stream.
const NO_IMAGE_MARKERS: &[&str] = &[
    "matches no streams",
    "does not contain any stream",
    "Output file is empty",
];

/// Builds the cover extraction command.
///
/// Audio is dropped and the first image stream is copied verbatim.
pub fn build_extract_cover<'a>(source: &'a SourceFile, scope: &CommandScope) -> EngineCommand<'a> {
    let input = scope.input_for(source);
    let output = scope.file("cover", "img");

    let mut args = Vec::new();
    push_all(
        &mut args,
        [
            "-i",
            input.as_str(),
            "-an",
            "-map",
            "0:v:0",
            "-c:v",
            "copy",
            "-frames:v",
            "1",
            "-f",
            "image2",
            "-update",
            "1",
            output.as_str(),
        ],
    );

    EngineCommand {
        inputs: vec![VirtualFile {
            name: input,
            bytes: &source.bytes,
        }],
        args,
        output,
        naming: ResultNaming::DetectedImage {
            stem: source.stem().to_string(),
        },
    }
}

/// Whether a failed or empty extraction means "no cover" rather than an
/// engine failure.
pub fn indicates_missing_cover(log: &LogTail) -> bool {
    NO_IMAGE_MARKERS.iter().any(|marker| log.contains(marker))
}
