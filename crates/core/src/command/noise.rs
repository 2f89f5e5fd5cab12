//! Noise synthesis + concatenation.

use super::types::{push_all, CommandScope, EngineCommand, ResultNaming, VirtualFile};
use crate::format::{bitrate_args, describe, AudioFormat};
use crate::operation::{NoiseColor, NoiseRequest, OperationError, SourceFile};

/// Output codec of noise+concat, independent of the input format.
pub const NOISE_OUTPUT_FORMAT: AudioFormat = AudioFormat::Mp3;

const SAMPLE_RATE: u32 = 44100;
const PINK_BAND: (u32, u32) = (20, 4000);

fn normalize_chain() -> String {
    format!(
        "aformat=sample_fmts=fltp:sample_rates={}:channel_layouts=stereo",
        SAMPLE_RATE
    )
}

/// Filter graph synthesizing the noise, normalizing both sides and joining
/// them noise-first.
pub fn noise_filter_graph(request: &NoiseRequest) -> String {
    let mut noise = format!(
        "anoisesrc=color=white:duration={}:amplitude={}:sample_rate={}",
        request.duration_secs, request.amplitude, SAMPLE_RATE
    );
    if request.noise_type == NoiseColor::Pink {
        noise.push_str(&format!(
            ",highpass=f={},lowpass=f={}",
            PINK_BAND.0, PINK_BAND.1
        ));
    }
    let normalize = normalize_chain();
    format!(
        "{noise},{normalize}[noise];[0:a:0]{normalize}[track];[noise][track]concat=n=2:v=0:a=1[out]"
    )
}

/// Builds the noise+concat command.
pub fn build_noise<'a>(
    source: &'a SourceFile,
    request: &NoiseRequest,
    scope: &CommandScope,
) -> Result<EngineCommand<'a>, OperationError> {
    if !(request.duration_secs.is_finite() && request.duration_secs > 0.0) {
        return Err(OperationError::validation(
            "noise duration must be a positive number of seconds",
        ));
    }
    if !(request.amplitude.is_finite() && request.amplitude > 0.0 && request.amplitude <= 1.0) {
        return Err(OperationError::validation(
            "noise amplitude must be within (0, 1]",
        ));
    }

    let descriptor = describe(NOISE_OUTPUT_FORMAT);
    let input = scope.input_for(source);
    let output = scope.file("output", descriptor.extension);

    let mut args = Vec::new();
    push_all(&mut args, ["-i", input.as_str()]);
    push_all(
        &mut args,
        [
            "-filter_complex".to_string(),
            noise_filter_graph(request),
            "-map".to_string(),
            "[out]".to_string(),
            "-c:a".to_string(),
            descriptor.codec.to_string(),
        ],
    );
    args.extend(bitrate_args(NOISE_OUTPUT_FORMAT, request.bitrate));
    args.push(output.clone());

    Ok(EngineCommand {
        inputs: vec![VirtualFile {
            name: input,
            bytes: &source.bytes,
        }],
        args,
        output,
        naming: ResultNaming::fixed(
            format!("{}_noise.{}", source.stem(), descriptor.extension),
            descriptor.mime_type,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Bitrate;
    use crate::testing::fixtures::{arg_after, audio_file};

    fn request(color: NoiseColor) -> NoiseRequest {
        NoiseRequest {
            noise_type: color,
            duration_secs: 180.0,
            amplitude: 0.05,
            bitrate: Bitrate::from_kbps(192),
        }
    }

    #[test]
    fn test_pink_noise_command() {
        let source = audio_file("track.flac");
        let command = build_noise(&source, &request(NoiseColor::Pink), &CommandScope::new("s"))
            .unwrap();

        assert_eq!(command.inputs[0].name, "s-input.flac");
        assert_eq!(command.output, "s-output.mp3");
        assert_eq!(command.args.last().unwrap(), "s-output.mp3");
        assert_eq!(arg_after(&command.args, "-c:a"), Some("libmp3lame"));
        assert_eq!(arg_after(&command.args, "-b:a"), Some("192k"));

        let graph = arg_after(&command.args, "-filter_complex").unwrap();
        assert!(graph.starts_with("anoisesrc=color=white:duration=180:amplitude=0.05"));
        assert!(graph.contains("highpass=f=20,lowpass=f=4000"));
        assert!(graph.ends_with("[noise][track]concat=n=2:v=0:a=1[out]"));

        assert_eq!(
            command.naming,
            ResultNaming::fixed("track_noise.mp3", "audio/mpeg")
        );
    }

    #[test]
    fn test_white_noise_has_no_band_filter() {
        let graph = noise_filter_graph(&request(NoiseColor::White));
        assert!(!graph.contains("highpass"));
        assert!(!graph.contains("lowpass"));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let source = audio_file("track.mp3");
        let scope = CommandScope::new("s");

        let mut zero = request(NoiseColor::White);
        zero.duration_secs = 0.0;
        assert!(matches!(
            build_noise(&source, &zero, &scope),
            Err(OperationError::Validation { .. })
        ));

        let mut loud = request(NoiseColor::White);
        loud.amplitude = 1.5;
        assert!(matches!(
            build_noise(&source, &loud, &scope),
            Err(OperationError::Validation { .. })
        ));
    }
}
