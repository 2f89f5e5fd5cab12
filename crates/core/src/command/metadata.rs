//! Metadata export, parsing and rewriting.

use super::types::{push_all, CommandScope, EngineCommand, ResultNaming, VirtualFile};
use crate::format::{describe, AudioFormat, CoverArtMode};
use crate::operation::{OperationError, RetagRequest, SourceFile, TagSet};
use crate::picture::{detect_image_mime, image_extension, picture_tag_value};

const FFMETADATA_HEADER: &str = ";FFMETADATA1";

/// Builds the metadata export command.
pub fn build_read_metadata<'a>(source: &'a SourceFile, scope: &CommandScope) -> EngineCommand<'a> {
    let input = scope.input_for(source);
    let output = scope.file("metadata", "txt");

    let mut args = Vec::new();
    push_all(&mut args, ["-i", input.as_str()]);
    // Vorbis comments in Ogg live on the audio stream, not the container.
    if source.format() == Some(AudioFormat::Ogg) {
        push_all(&mut args, ["-map_metadata", "0:s:a:0"]);
    }
    push_all(&mut args, ["-f", "ffmetadata", output.as_str()]);

    EngineCommand {
        inputs: vec![VirtualFile {
            name: input,
            bytes: &source.bytes,
        }],
        args,
        output,
        naming: ResultNaming::fixed(format!("{}.txt", source.stem()), "text/plain"),
    }
}

/// One logical line of an ffmetadata dump: characters plus whether each
/// was escaped.
type LogicalLine = Vec<(char, bool)>;

fn logical_lines(text: &str) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut current = LogicalLine::new();
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push((escaped, true)),
                None => current.push(('\\', false)),
            },
            '\n' => lines.push(std::mem::take(&mut current)),
            '\r' => {}
            other => current.push((other, false)),
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Parses an ffmetadata dump into the canonical tag set.
///
/// Keys match case-insensitively; `date` and `year` both fill `year` (first
/// non-empty wins). Parsing stops at the first section header, so stream and
/// chapter metadata never leak into the result. Missing keys stay empty.
pub fn parse_ffmetadata(text: &str) -> TagSet {
    let mut tags = TagSet::default();

    for line in logical_lines(text) {
        let Some(&(first, first_escaped)) = line.first() else {
            continue;
        };
        if !first_escaped {
            if first == '[' {
                break;
            }
            if first == ';' || first == '#' {
                continue;
            }
        }

        let Some(split) = line.iter().position(|&(c, escaped)| c == '=' && !escaped) else {
            continue;
        };
        let key: String = line[..split].iter().map(|&(c, _)| c).collect();
        let value: String = line[split + 1..].iter().map(|&(c, _)| c).collect();

        let slot = match key.trim().to_ascii_lowercase().as_str() {
            "title" => &mut tags.title,
            "artist" => &mut tags.artist,
            "album" => &mut tags.album,
            "date" | "year" => &mut tags.year,
            "track" => &mut tags.track,
            "genre" => &mut tags.genre,
            _ => continue,
        };
        if slot.is_empty() {
            *slot = value;
        }
    }

    tags
}

/// Renders a tag set as an ffmetadata dump.
pub fn render_ffmetadata(tags: &TagSet) -> String {
    let mut out = String::from(FFMETADATA_HEADER);
    out.push('\n');
    for (key, value) in tags.entries() {
        out.push_str(key);
        out.push('=');
        for c in value.chars() {
            if matches!(c, '=' | ';' | '#' | '\\' | '\n') {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('\n');
    }
    out
}

/// Builds the retag command.
///
/// All existing metadata is cleared before the requested fields are written,
/// and audio is stream-copied. A new cover replaces any existing image;
/// without one, formats with attached pictures keep theirs, and Ogg re-embeds
/// `existing_cover` (discovered beforehand) as a picture comment.
pub fn build_retag<'a>(
    source: &'a SourceFile,
    request: &'a RetagRequest,
    existing_cover: Option<&'a [u8]>,
    scope: &CommandScope,
) -> Result<EngineCommand<'a>, OperationError> {
    let format = source.format();
    let mode = format
        .map(|f| f.cover_art_mode())
        .unwrap_or(CoverArtMode::AttachedPicture);
    let new_cover = request.cover.as_deref().filter(|cover| !cover.is_empty());

    if new_cover.is_some() && mode == CoverArtMode::Unsupported {
        return Err(OperationError::validation(format!(
            "{} files cannot carry cover art",
            format.map(|f| f.id()).unwrap_or("these")
        )));
    }

    let input = scope.input_for(source);
    let ext = source.extension().unwrap_or_else(|| "bin".to_string());
    let output = scope.file("output", &ext);
    let mut inputs = vec![VirtualFile {
        name: input.clone(),
        bytes: &source.bytes,
    }];

    let mut args = Vec::new();
    push_all(&mut args, ["-i", input.as_str()]);

    match (mode, new_cover) {
        (CoverArtMode::AttachedPicture, Some(cover)) => {
            let cover_name = scope.file("cover", image_extension(detect_image_mime(cover)));
            push_all(
                &mut args,
                [
                    "-i",
                    cover_name.as_str(),
                    "-map",
                    "0:a",
                    "-map",
                    "1:0",
                    "-c:v",
                    "copy",
                    "-disposition:v:0",
                    "attached_pic",
                ],
            );
            inputs.push(VirtualFile {
                name: cover_name,
                bytes: cover,
            });
        }
        (CoverArtMode::AttachedPicture, None) => {
            push_all(&mut args, ["-map", "0:a", "-map", "0:v?", "-c:v", "copy"]);
        }
        (CoverArtMode::PictureComment | CoverArtMode::Unsupported, _) => {
            push_all(&mut args, ["-map", "0:a"]);
        }
    }

    push_all(
        &mut args,
        [
            "-map_metadata",
            "-1",
            "-map_metadata:s",
            "-1",
            "-map_chapters",
            "-1",
            "-c:a",
            "copy",
        ],
    );
    args.extend(container_tag_args(format));

    for (key, value) in request.tags.entries() {
        args.push("-metadata".to_string());
        args.push(format!("{}={}", key, value));
    }

    if mode == CoverArtMode::PictureComment {
        if let Some(image) = new_cover.or(existing_cover) {
            args.push("-metadata".to_string());
            args.push(picture_tag_value(image));
        }
    }

    args.push(output.clone());

    let mime_type = format
        .map(|f| describe(f).mime_type)
        .unwrap_or("application/octet-stream");

    Ok(EngineCommand {
        inputs,
        args,
        output,
        naming: ResultNaming::fixed(source.name.clone(), mime_type),
    })
}

/// Muxer options needed for tags (and attached pictures) to be written.
pub(crate) fn container_tag_args(format: Option<AudioFormat>) -> Vec<String> {
    match format {
        Some(AudioFormat::Mp3) => vec!["-id3v2_version".to_string(), "3".to_string()],
        Some(AudioFormat::Aiff) => vec!["-write_id3v2".to_string(), "1".to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picture::PICTURE_TAG;
    use crate::testing::fixtures::{arg_after, args_after, audio_file, jpeg_bytes, png_bytes};

    #[test]
    fn test_parse_ffmetadata_basic() {
        let text = ";FFMETADATA1\nTITLE=Song\nArtist=Someone\nalbum=Record\ndate=2001\nencoder=Lavf60\n";
        let tags = parse_ffmetadata(text);
        assert_eq!(tags.title, "Song");
        assert_eq!(tags.artist, "Someone");
        assert_eq!(tags.album, "Record");
        assert_eq!(tags.year, "2001");
        assert_eq!(tags.track, "");
        assert_eq!(tags.genre, "");
    }

    #[test]
    fn test_parse_ffmetadata_escapes_and_sections() {
        let text = ";FFMETADATA1\ntitle=a\\=b\\;c\nartist=line\\\nbreak\n[STREAM]\nalbum=stream-level\n";
        let tags = parse_ffmetadata(text);
        assert_eq!(tags.title, "a=b;c");
        assert_eq!(tags.artist, "line\nbreak");
        assert_eq!(tags.album, "");
    }

    #[test]
    fn test_parse_ffmetadata_year_alias() {
        let tags = parse_ffmetadata("YEAR=1999\ndate=2005\n");
        assert_eq!(tags.year, "1999");
    }

    #[test]
    fn test_render_then_parse_preserves_values() {
        let tags = TagSet {
            title: "x=y".to_string(),
            artist: "B".to_string(),
            track: "3/12".to_string(),
            ..Default::default()
        };
        assert_eq!(parse_ffmetadata(&render_ffmetadata(&tags)), tags);
    }

    #[test]
    fn test_read_metadata_command() {
        let source = audio_file("a.mp3");
        let command = build_read_metadata(&source, &CommandScope::new("m"));
        assert_eq!(arg_after(&command.args, "-f"), Some("ffmetadata"));
        assert!(!command.args.contains(&"-map_metadata".to_string()));
        assert_eq!(command.output, "m-metadata.txt");

        let ogg = audio_file("a.ogg");
        let command = build_read_metadata(&ogg, &CommandScope::new("m"));
        assert_eq!(arg_after(&command.args, "-map_metadata"), Some("0:s:a:0"));
    }

    fn retag_request(cover: Option<Vec<u8>>) -> RetagRequest {
        RetagRequest {
            tags: TagSet {
                title: "A".to_string(),
                artist: "B".to_string(),
                ..Default::default()
            },
            cover,
        }
    }

    #[test]
    fn test_retag_clears_and_writes_only_given_fields() {
        let source = audio_file("song.mp3");
        let request = retag_request(None);
        let command = build_retag(&source, &request, None, &CommandScope::new("r")).unwrap();

        assert_eq!(arg_after(&command.args, "-map_metadata"), Some("-1"));
        assert_eq!(arg_after(&command.args, "-c:a"), Some("copy"));
        assert_eq!(arg_after(&command.args, "-id3v2_version"), Some("3"));
        assert_eq!(
            args_after(&command.args, "-metadata"),
            vec!["title=A", "artist=B"]
        );
        assert_eq!(args_after(&command.args, "-map"), vec!["0:a", "0:v?"]);
        assert_eq!(
            command.naming,
            ResultNaming::fixed("song.mp3", "audio/mpeg")
        );
        assert_eq!(command.output, "r-output.mp3");
    }

    #[test]
    fn test_retag_with_new_cover_replaces_image() {
        let source = audio_file("song.flac");
        let request = retag_request(Some(png_bytes()));
        let command = build_retag(&source, &request, None, &CommandScope::new("r")).unwrap();

        assert_eq!(command.inputs.len(), 2);
        assert_eq!(command.inputs[1].name, "r-cover.png");
        assert_eq!(args_after(&command.args, "-map"), vec!["0:a", "1:0"]);
        assert_eq!(arg_after(&command.args, "-disposition:v:0"), Some("attached_pic"));
    }

    #[test]
    fn test_retag_ogg_embeds_picture_comment() {
        let source = audio_file("song.ogg");
        let existing = jpeg_bytes();
        let request = retag_request(None);
        let command =
            build_retag(&source, &request, Some(&existing), &CommandScope::new("r")).unwrap();

        assert_eq!(command.inputs.len(), 1);
        assert_eq!(args_after(&command.args, "-map"), vec!["0:a"]);
        let picture = args_after(&command.args, "-metadata")
            .into_iter()
            .find(|value| value.starts_with(PICTURE_TAG))
            .unwrap();
        assert_eq!(picture, picture_tag_value(&existing));
    }

    #[test]
    fn test_retag_wav_rejects_cover() {
        let source = audio_file("song.wav");
        let request = retag_request(Some(jpeg_bytes()));
        assert!(matches!(
            build_retag(&source, &request, None, &CommandScope::new("r")),
            Err(OperationError::Validation { .. })
        ));

        let plain = retag_request(None);
        let command = build_retag(&source, &plain, None, &CommandScope::new("r")).unwrap();
        assert_eq!(args_after(&command.args, "-map"), vec!["0:a"]);
    }
}
