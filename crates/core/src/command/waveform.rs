//! Waveform rendering.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::{push_all, CommandScope, EngineCommand, ResultNaming, VirtualFile};
use crate::operation::{OperationError, SourceFile, WaveformRequest};

const MAX_DIMENSION: u32 = 8192;

static COLOR_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(#[0-9A-Fa-f]{6}([0-9A-Fa-f]{2})?|[A-Za-z]+)$").ok());

fn valid_color(color: &str) -> bool {
    COLOR_RE.as_ref().is_some_and(|re| re.is_match(color))
}

/// Builds the waveform command: one PNG frame from the wave-picture filter.
pub fn build_waveform<'a>(
    source: &'a SourceFile,
    request: &WaveformRequest,
    scope: &CommandScope,
) -> Result<EngineCommand<'a>, OperationError> {
    for (name, value) in [("width", request.width), ("height", request.height)] {
        if value == 0 || value > MAX_DIMENSION {
            return Err(OperationError::validation(format!(
                "waveform {} must be between 1 and {}",
                name, MAX_DIMENSION
            )));
        }
    }
    if !valid_color(&request.color) {
        return Err(OperationError::validation(format!(
            "waveform color {:?} must be #RRGGBB, #RRGGBBAA or a color name",
            request.color
        )));
    }

    let input = scope.input_for(source);
    let output = scope.file("waveform", "png");
    let graph = format!(
        "[0:a:0]showwavespic=s={}x{}:colors={}[wave]",
        request.width, request.height, request.color
    );

    let mut args = Vec::new();
    push_all(
        &mut args,
        [
            "-i",
            input.as_str(),
            "-filter_complex",
            graph.as_str(),
            "-map",
            "[wave]",
            "-frames:v",
            "1",
            "-update",
            "1",
            output.as_str(),
        ],
    );

    Ok(EngineCommand {
        inputs: vec![VirtualFile {
            name: input,
            bytes: &source.bytes,
        }],
        args,
        output,
        naming: ResultNaming::fixed(format!("{}_waveform.png", source.stem()), "image/png"),
    })
}
