//! Format conversion.

use super::metadata::container_tag_args;
use super::types::{push_all, CommandScope, EngineCommand, ResultNaming, VirtualFile};
use crate::format::{bitrate_args, capabilities, describe, ChannelSelection, CoverArtMode};
use crate::operation::{ConvertRequest, OperationError, SourceFile};
use crate::picture::picture_tag_value;

/// Builds the conversion command.
///
/// The sample-rate/channel request is validated first; nothing is built for
/// a combination the target format does not allow. `source_cover` is only
/// used for targets that embed pictures as a comment.
pub fn build_convert<'a>(
    source: &'a SourceFile,
    request: &ConvertRequest,
    source_cover: Option<&[u8]>,
    scope: &CommandScope,
) -> Result<EngineCommand<'a>, OperationError> {
    capabilities(request.format).validate(request.sample_rate, request.channels)?;

    let descriptor = describe(request.format);
    let input = scope.input_for(source);
    let output = scope.file("output", descriptor.extension);

    let mut args = Vec::new();
    push_all(&mut args, ["-i", input.as_str(), "-map", "0:a:0"]);

    let mode = request.format.cover_art_mode();
    if mode == CoverArtMode::AttachedPicture {
        push_all(
            &mut args,
            [
                "-map",
                "0:v:0?",
                "-c:v",
                "copy",
                "-disposition:v:0",
                "attached_pic",
            ],
        );
    }

    push_all(&mut args, ["-c:a", descriptor.codec]);
    args.extend(bitrate_args(request.format, request.bitrate));

    if let Some(rate) = request.sample_rate {
        args.push("-ar".to_string());
        args.push(rate.to_string());
    }
    if let ChannelSelection::Count(count) = request.channels {
        args.push("-ac".to_string());
        args.push(count.to_string());
    }

    args.extend(container_tag_args(Some(request.format)));

    if mode == CoverArtMode::PictureComment {
        if let Some(image) = source_cover.filter(|image| !image.is_empty()) {
            args.push("-metadata".to_string());
            args.push(picture_tag_value(image));
        }
    }

    args.push(output.clone());

    Ok(EngineCommand {
        inputs: vec![VirtualFile {
            name: input,
            bytes: &source.bytes,
        }],
        args,
        output,
        naming: ResultNaming::fixed(
            format!("{}.{}", source.stem(), descriptor.extension),
            descriptor.mime_type,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{AudioFormat, Bitrate};
    use crate::picture::PICTURE_TAG;
    use crate::testing::fixtures::{arg_after, args_after, audio_file, png_bytes};

    fn request(format: AudioFormat) -> ConvertRequest {
        ConvertRequest {
            format,
            bitrate: Bitrate::from_kbps(192),
            sample_rate: None,
            channels: ChannelSelection::Auto,
        }
    }

    #[test]
    fn test_lossless_targets_never_get_bitrate() {
        let source = audio_file("in.mp3");
        for format in AudioFormat::ALL {
            let command =
                build_convert(&source, &request(format), None, &CommandScope::new("v")).unwrap();
            let has_rate_control = command.args.iter().any(|a| a == "-b:a" || a == "-q:a");
            assert_eq!(
                has_rate_control,
                !describe(format).is_lossless,
                "format {}",
                format
            );
        }
    }

    #[test]
    fn test_mp3_conversion_args() {
        let source = audio_file("Track.wav");
        let mut req = request(AudioFormat::Mp3);
        req.sample_rate = Some(44100);
        req.channels = ChannelSelection::Count(2);
        let command = build_convert(&source, &req, None, &CommandScope::new("v")).unwrap();

        assert_eq!(args_after(&command.args, "-map"), vec!["0:a:0", "0:v:0?"]);
        assert_eq!(arg_after(&command.args, "-c:a"), Some("libmp3lame"));
        assert_eq!(arg_after(&command.args, "-b:a"), Some("192k"));
        assert_eq!(arg_after(&command.args, "-ar"), Some("44100"));
        assert_eq!(arg_after(&command.args, "-ac"), Some("2"));
        assert_eq!(arg_after(&command.args, "-disposition:v:0"), Some("attached_pic"));
        assert_eq!(command.naming, ResultNaming::fixed("Track.mp3", "audio/mpeg"));
    }

    #[test]
    fn test_ogg_uses_quality_and_picture_comment() {
        let source = audio_file("in.flac");
        let cover = png_bytes();
        let command = build_convert(
            &source,
            &request(AudioFormat::Ogg),
            Some(&cover),
            &CommandScope::new("v"),
        )
        .unwrap();

        assert_eq!(arg_after(&command.args, "-q:a"), Some("6"));
        assert!(!command.args.contains(&"-b:a".to_string()));
        assert_eq!(args_after(&command.args, "-map"), vec!["0:a:0"]);
        let tag = arg_after(&command.args, "-metadata").unwrap();
        assert!(tag.starts_with(PICTURE_TAG));
        assert_eq!(command.output, "v-output.ogg");
    }

    #[test]
    fn test_wav_ignores_images() {
        let source = audio_file("in.mp3");
        let command =
            build_convert(&source, &request(AudioFormat::Wav), None, &CommandScope::new("v"))
                .unwrap();
        assert_eq!(args_after(&command.args, "-map"), vec!["0:a:0"]);
        assert!(!command.args.contains(&"-metadata".to_string()));
    }

    #[test]
    fn test_invalid_combination_fails_validation() {
        let source = audio_file("in.mp3");
        let mut req = request(AudioFormat::Ogg);
        req.channels = ChannelSelection::Count(6);
        let err = build_convert(&source, &req, None, &CommandScope::new("v")).unwrap_err();
        assert!(matches!(err, OperationError::Validation { .. }));
        assert!(err.to_string().contains("1, 2"));

        let mut rate = request(AudioFormat::Mp3);
        rate.sample_rate = Some(96000);
        assert!(build_convert(&source, &rate, None, &CommandScope::new("v")).is_err());
    }

    #[test]
    fn test_auto_channels_skip_channel_check() {
        let source = audio_file("in.mp3");
        let req = request(AudioFormat::Wav);
        let command = build_convert(&source, &req, None, &CommandScope::new("v")).unwrap();
        assert!(!command.args.contains(&"-ac".to_string()));
    }
}
