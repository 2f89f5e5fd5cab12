//! Operation lifecycle integration tests.
//!
//! These tests drive the executor and batch orchestrator end to end against
//! a mock engine that imitates a tagged container: each file is an
//! ffmetadata header, a NUL separator, then opaque audio (and optionally a
//! cover marker).

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use audiokit_core::{
    command::render_ffmetadata,
    engine::{EngineError, EngineManager},
    operation::{
        ConvertRequest, NoiseColor, NoiseRequest, RetagRequest, TrimRequest,
    },
    testing::{fixtures, MockEngine, MockEngineLoader, MockFs},
    AudioFormat, BatchOrchestrator, Bitrate, ChannelSelection, ErrorCategory, OperationExecutor,
    OperationRequest, ProgressCallback, ProgressEvent, SourceFile, TagSet,
};

const SEPARATOR: u8 = 0;

/// Test helper wiring a mock engine into an executor and orchestrator.
struct TestHarness {
    engine: MockEngine,
    loader: Arc<MockEngineLoader>,
    executor: OperationExecutor,
    batch: BatchOrchestrator,
}

impl TestHarness {
    fn new() -> Self {
        let engine = MockEngine::new();
        let loader = Arc::new(MockEngineLoader::new(engine.clone()));
        let manager = Arc::new(EngineManager::new(loader.clone()));
        let executor = OperationExecutor::new(manager).with_log_tail_lines(4);
        let batch = BatchOrchestrator::new(executor.clone());
        Self {
            engine,
            loader,
            executor,
            batch,
        }
    }

    /// Installs the tagged-container simulation.
    fn with_container_engine(self) -> Self {
        self.engine.set_handler(container_handler);
        self
    }
}

fn container(tags: &TagSet, audio: &[u8]) -> Vec<u8> {
    let mut bytes = render_ffmetadata(tags).into_bytes();
    bytes.push(SEPARATOR);
    bytes.extend_from_slice(audio);
    bytes
}

fn split_container(bytes: &[u8]) -> (&[u8], &[u8]) {
    match bytes.iter().position(|b| *b == SEPARATOR) {
        Some(index) => (&bytes[..index], &bytes[index + 1..]),
        None => (&[], bytes),
    }
}

fn escape(value: &str) -> String {
    let mut out = String::new();
    for c in value.chars() {
        if matches!(c, '=' | ';' | '#' | '\\' | '\n') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn container_handler(args: &[String], files: &mut MockFs) -> Result<(), EngineError> {
    let input = fixtures::arg_after(args, "-i")
        .ok_or_else(|| EngineError::exec_failed(Some(1), "no input"))?;
    let output = args
        .last()
        .ok_or_else(|| EngineError::exec_failed(Some(1), "no output"))?
        .clone();
    let source = files
        .get(input)
        .cloned()
        .ok_or_else(|| EngineError::FileNotFound {
            name: input.to_string(),
        })?;
    let (header, audio) = split_container(&source);

    if fixtures::arg_after(args, "-f") == Some("ffmetadata") {
        files.insert(output, header.to_vec());
        return Ok(());
    }

    let mut new_header = if fixtures::arg_after(args, "-map_metadata") == Some("-1") {
        ";FFMETADATA1\n".to_string()
    } else {
        String::from_utf8_lossy(header).into_owned()
    };
    for entry in fixtures::args_after(args, "-metadata") {
        if let Some((key, value)) = entry.split_once('=') {
            new_header.push_str(&format!("{}={}\n", key, escape(value)));
        }
    }

    let mut bytes = new_header.into_bytes();
    bytes.push(SEPARATOR);
    bytes.extend_from_slice(audio);
    files.insert(output, bytes);
    Ok(())
}

fn recording() -> (ProgressCallback, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback =
        Arc::new(move |event: ProgressEvent| sink.lock().unwrap().push(event.percent));
    (callback, seen)
}

#[tokio::test]
async fn test_retag_then_read_metadata_drops_stale_tags() {
    let harness = TestHarness::new().with_container_engine();
    let stale = TagSet {
        title: "Old".to_string(),
        album: "Stale Album".to_string(),
        year: "1987".to_string(),
        track: "7".to_string(),
        ..Default::default()
    };
    let source = SourceFile::new("song.mp3", container(&stale, b"AUDIO"));

    let before = harness.executor.read_metadata(&source, None).await.unwrap();
    assert_eq!(before.album, "Stale Album");

    let request = OperationRequest::RetagAudio(RetagRequest {
        tags: TagSet {
            title: "A".to_string(),
            artist: "B".to_string(),
            ..Default::default()
        },
        cover: None,
    });
    let retagged = harness.executor.run(&source, &request, None).await.unwrap();
    assert_eq!(retagged.filename, "song.mp3");
    assert_eq!(retagged.mime_type, "audio/mpeg");

    let tags = harness
        .executor
        .read_metadata(&SourceFile::new(retagged.filename, retagged.bytes), None)
        .await
        .unwrap();
    assert_eq!(
        tags,
        TagSet {
            title: "A".to_string(),
            artist: "B".to_string(),
            album: String::new(),
            year: String::new(),
            track: String::new(),
            genre: String::new(),
        }
    );
    assert!(harness.engine.file_names().is_empty());
}

#[tokio::test]
async fn test_retag_preserves_escaped_values() {
    let harness = TestHarness::new().with_container_engine();
    let source = SourceFile::new("song.flac", container(&TagSet::default(), b"AUDIO"));
    let tags = TagSet {
        title: "Live = Loud; #1".to_string(),
        genre: "Rock".to_string(),
        ..Default::default()
    };

    let retagged = harness
        .executor
        .run(
            &source,
            &OperationRequest::RetagAudio(RetagRequest {
                tags: tags.clone(),
                cover: None,
            }),
            None,
        )
        .await
        .unwrap();
    let read = harness
        .executor
        .read_metadata(&SourceFile::new("song.flac", retagged.bytes), None)
        .await
        .unwrap();
    assert_eq!(read, tags);
}

#[tokio::test]
async fn test_passthrough_trim_copies_streams() {
    let harness = TestHarness::new();
    harness.engine.set_handler(|args, files| {
        let input = fixtures::arg_after(args, "-i").unwrap_or_default().to_string();
        let bytes = files.get(&input).cloned().unwrap_or_default();
        if let Some(output) = args.last() {
            files.insert(output.clone(), bytes);
        }
        Ok(())
    });
    let source = SourceFile::new("clip.mp3", b"AUDIO+COVER".to_vec());
    let request = OperationRequest::TrimAudio(TrimRequest {
        start_secs: 2.0,
        end_secs: 12.0,
        format: Some(AudioFormat::Mp3),
        bitrate: Bitrate::from_kbps(192),
        remove_silence: false,
        silence_threshold_db: -50.0,
        silence_duration_secs: 0.5,
    });

    let result = harness.executor.run(&source, &request, None).await.unwrap();

    let args = harness.engine.last_args().unwrap();
    assert_eq!(fixtures::arg_after(&args, "-c"), Some("copy"));
    assert_eq!(fixtures::arg_after(&args, "-map"), Some("0"));
    assert!(!args.iter().any(|a| a == "-c:a"));
    assert_eq!(result.bytes, b"AUDIO+COVER");
    assert_eq!(result.filename, "clip_trimmed.mp3");
}

#[tokio::test]
async fn test_noise_scenario_command() {
    let harness = TestHarness::new();
    let (callback, seen) = recording();
    let request = OperationRequest::AddNoiseAndConcat(NoiseRequest {
        noise_type: NoiseColor::Pink,
        duration_secs: 180.0,
        amplitude: 0.05,
        bitrate: "192k".parse().unwrap(),
    });

    let result = harness
        .executor
        .run(&fixtures::audio_file("track.wav"), &request, Some(callback))
        .await
        .unwrap();

    assert_eq!(result.filename, "track_noise.mp3");
    assert_eq!(result.mime_type, "audio/mpeg");
    let args = harness.engine.last_args().unwrap();
    assert_eq!(fixtures::arg_after(&args, "-c:a"), Some("libmp3lame"));
    assert_eq!(fixtures::arg_after(&args, "-b:a"), Some("192k"));
    let graph = fixtures::arg_after(&args, "-filter_complex").unwrap();
    assert!(graph.contains("duration=180"));
    assert!(graph.contains("concat=n=2:v=0:a=1"));
    assert_eq!(*seen.lock().unwrap(), vec![100]);
}

#[tokio::test]
async fn test_cover_extraction_without_image_is_recoverable() {
    let harness = TestHarness::new();
    harness.engine.set_handler(|_, _| {
        Err(EngineError::exec_failed(Some(1), "ffmpeg exited with 1"))
    });
    harness.engine.set_events(vec![audiokit_core::engine::EngineEvent::Log(
        "Stream map '0:v:0' matches no streams.".to_string(),
    )]);

    let err = harness
        .executor
        .run(&fixtures::audio_file("bare.mp3"), &OperationRequest::ExtractCover, None)
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::NoCover);
    assert!(err.is_recoverable());
    assert!(harness.engine.file_names().is_empty());
}

#[tokio::test]
async fn test_invalid_convert_touches_nothing() {
    let harness = TestHarness::new();
    let request = OperationRequest::ConvertFormat(ConvertRequest {
        format: AudioFormat::Aac,
        bitrate: Bitrate::from_kbps(128),
        sample_rate: Some(44100),
        channels: ChannelSelection::Count(4),
    });

    let err = harness
        .executor
        .run(&fixtures::audio_file("a.wav"), &request, None)
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(err.to_string().contains("1, 2, 6"));
    assert_eq!(harness.loader.load_count(), 0);
    assert!(harness.engine.deleted_names().is_empty());
}

#[tokio::test]
async fn test_engine_load_retries_after_failure() {
    let harness = TestHarness::new();
    harness.loader.fail_next_loads(1);
    let source = fixtures::audio_file("a.mp3");

    let first = harness
        .executor
        .run(&source, &OperationRequest::ExtractCover, None)
        .await
        .unwrap_err();
    assert_eq!(first.category(), ErrorCategory::EngineLoad);

    harness.engine.set_output(fixtures::jpeg_bytes());
    let second = harness
        .executor
        .run(&source, &OperationRequest::ExtractCover, None)
        .await
        .unwrap();
    assert_eq!(second.filename, "a_cover.jpg");
    assert_eq!(harness.loader.load_count(), 2);
}

#[tokio::test]
async fn test_concurrent_operations_share_engine_safely() {
    let harness = Arc::new(TestHarness::new());
    let mut handles = Vec::new();
    for name in ["one.mp3", "two.mp3", "three.mp3"] {
        let harness = Arc::clone(&harness);
        handles.push(tokio::spawn(async move {
            let request = OperationRequest::ConvertFormat(ConvertRequest {
                format: AudioFormat::Flac,
                bitrate: Bitrate::from_kbps(192),
                sample_rate: None,
                channels: ChannelSelection::Auto,
            });
            harness
                .executor
                .run(&fixtures::audio_file(name), &request, None)
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(harness.loader.load_count(), 1);
    assert_eq!(harness.engine.executions().len(), 3);
    assert!(harness.engine.file_names().is_empty());
}

#[tokio::test]
async fn test_batch_archive_names_are_unique() {
    let harness = TestHarness::new();
    let files = vec![
        fixtures::audio_file("mix.mp3"),
        fixtures::audio_file("mix.wav"),
        fixtures::audio_file("mix.flac"),
    ];
    let request = OperationRequest::RenderWaveform(Default::default());

    let result = harness.batch.run(&files, &request, None).await.unwrap();

    let names: Vec<&str> = result.items.iter().map(|i| i.filename.as_str()).collect();
    assert_eq!(
        names,
        vec!["mix_waveform.png", "mix_waveform_1.png", "mix_waveform_2.png"]
    );
    assert_eq!(result.archive.filename, "waveform_results.zip");

    let mut archive = zip::ZipArchive::new(Cursor::new(result.archive.bytes)).unwrap();
    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).unwrap();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"mock-output");
        entries.push(entry.name().to_string());
    }
    assert_eq!(entries, names);
}
