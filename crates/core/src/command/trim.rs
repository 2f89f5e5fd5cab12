//! Trimming with optional silence removal.

use super::metadata::container_tag_args;
use super::types::{push_all, secs, CommandScope, EngineCommand, ResultNaming, VirtualFile};
use crate::format::{bitrate_args, describe, AudioFormat, CoverArtMode};
use crate::operation::{OperationError, SourceFile, TrimRequest};
use crate::picture::picture_tag_value;

/// Converts a dBFS threshold to linear amplitude.
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Whether the trim can stream-copy instead of re-encoding.
///
/// True when the output stays in the source format and no silence filter is
/// requested. Attached pictures are copied along; Ogg covers are written
/// back as a picture comment.
pub fn is_passthrough(source_format: Option<AudioFormat>, request: &TrimRequest) -> bool {
    !request.remove_silence && (request.format.is_none() || request.format == source_format)
}

/// Silence-stripping filter removing every qualifying segment.
pub fn silence_filter(threshold_db: f64, duration_secs: f64) -> String {
    let threshold = format!("{:.6}", db_to_linear(threshold_db));
    format!(
        "silenceremove=start_periods=1:start_duration={d}:start_threshold={t}:stop_periods=-1:stop_duration={d}:stop_threshold={t}",
        d = duration_secs,
        t = threshold
    )
}

/// Stream mapping for a passthrough copy of `format`.
fn passthrough_map_args(format: Option<AudioFormat>) -> [&'static str; 4] {
    match format.map(|f| f.cover_art_mode()) {
        // The Ogg muxer rejects picture streams; WAV cannot carry them.
        Some(CoverArtMode::PictureComment | CoverArtMode::Unsupported) => {
            ["-map", "0:a", "-c:a", "copy"]
        }
        Some(CoverArtMode::AttachedPicture) | None => ["-map", "0", "-c", "copy"],
    }
}

/// Builds the trim command.
///
/// `source_cover` is re-embedded when a passthrough copy drops the picture
/// stream of a picture-comment format.
pub fn build_trim<'a>(
    source: &'a SourceFile,
    request: &TrimRequest,
    source_cover: Option<&[u8]>,
    scope: &CommandScope,
) -> Result<EngineCommand<'a>, OperationError> {
    if !(request.start_secs.is_finite() && request.end_secs.is_finite()) {
        return Err(OperationError::validation("trim times must be finite"));
    }
    if request.start_secs < 0.0 {
        return Err(OperationError::validation("trim start must not be negative"));
    }
    let duration = request.end_secs - request.start_secs;
    if duration <= 0.0 {
        return Err(OperationError::invariant(format!(
            "trim duration is not positive (start {}, end {})",
            request.start_secs, request.end_secs
        )));
    }
    if request.remove_silence
        && !(request.silence_duration_secs.is_finite() && request.silence_duration_secs > 0.0)
    {
        return Err(OperationError::validation(
            "silence duration must be a positive number of seconds",
        ));
    }

    let source_format = source.format();
    let input = scope.input_for(source);
    let mut args = Vec::new();
    push_all(
        &mut args,
        [
            "-ss".to_string(),
            secs(request.start_secs),
            "-i".to_string(),
            input.clone(),
            "-t".to_string(),
            secs(duration),
        ],
    );

    let (output, naming) = if is_passthrough(source_format, request) {
        let ext = source.extension().unwrap_or_else(|| "bin".to_string());
        let output = scope.file("output", &ext);
        push_all(&mut args, passthrough_map_args(source_format));
        args.extend(container_tag_args(source_format));
        if source_format.map(|f| f.cover_art_mode()) == Some(CoverArtMode::PictureComment) {
            if let Some(image) = source_cover.filter(|image| !image.is_empty()) {
                args.push("-metadata".to_string());
                args.push(picture_tag_value(image));
            }
        }
        let mime_type = source_format
            .map(|f| describe(f).mime_type)
            .unwrap_or("application/octet-stream");
        let naming =
            ResultNaming::fixed(format!("{}_trimmed.{}", source.stem(), ext), mime_type);
        (output, naming)
    } else {
        let target = request.format.or(source_format).ok_or_else(|| {
            OperationError::validation(format!(
                "cannot re-encode {}: unknown source format, choose an output format",
                source.name
            ))
        })?;
        let descriptor = describe(target);
        let output = scope.file("output", descriptor.extension);

        push_all(&mut args, ["-map", "0:a:0"]);
        if request.remove_silence {
            args.push("-af".to_string());
            args.push(silence_filter(
                request.silence_threshold_db,
                request.silence_duration_secs,
            ));
        }
        push_all(&mut args, ["-c:a", descriptor.codec]);
        args.extend(bitrate_args(target, request.bitrate));
        args.extend(container_tag_args(Some(target)));

        let naming = ResultNaming::fixed(
            format!("{}_trimmed.{}", source.stem(), descriptor.extension),
            descriptor.mime_type,
        );
        (output, naming)
    };

    args.push(output.clone());

    Ok(EngineCommand {
        inputs: vec![VirtualFile {
            name: input,
            bytes: &source.bytes,
        }],
        args,
        output,
        naming,
    })
}
