//! FFmpeg-process engine implementation.
//!
//! The virtual filesystem is a scratch directory owned by the engine instance;
//! commands run with it as their working directory so argument vectors only
//! ever reference bare file names.

use async_trait::async_trait;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::capabilities::{EngineBuild, HostFeatures};
use super::config::EngineConfig;
use super::error::EngineError;
use super::traits::{Engine, EngineEvent, EngineLoader};

/// Loads [`FfmpegEngine`] instances from the configured binary.
pub struct FfmpegLoader {
    config: EngineConfig,
}

impl FfmpegLoader {
    /// Creates a loader with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Creates a loader with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[async_trait]
impl EngineLoader for FfmpegLoader {
    async fn probe(&self) -> HostFeatures {
        HostFeatures::detect(&self.config).await
    }

    async fn load(&self, build: EngineBuild) -> Result<Arc<dyn Engine>, EngineError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::BinaryNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    EngineError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(EngineError::load_failed(format!(
                "ffmpeg -version exited with {}",
                output.status
            )));
        }

        let root = self
            .config
            .work_dir
            .join(format!("engine-{}", Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            EngineError::load_failed(format!(
                "cannot create scratch directory {}: {}",
                root.display(),
                e
            ))
        })?;

        debug!(root = %root.display(), %build, "Engine scratch directory ready");

        Ok(Arc::new(FfmpegEngine {
            ffmpeg_path: self.config.ffmpeg_path.clone(),
            log_level: self.config.log_level.clone(),
            root,
            build,
        }))
    }
}

/// An FFmpeg binary plus its scratch directory.
pub struct FfmpegEngine {
    ffmpeg_path: PathBuf,
    log_level: String,
    root: PathBuf,
    build: EngineBuild,
}

impl FfmpegEngine {
    /// Scratch directory backing the virtual filesystem.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, EngineError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\');
        if !valid {
            return Err(EngineError::InvalidFileName {
                name: name.to_string(),
            });
        }
        Ok(self.root.join(name))
    }

    fn command_args(&self, args: &[String]) -> Vec<String> {
        let mut full = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-nostats".to_string(),
            "-y".to_string(),
            "-loglevel".to_string(),
            self.log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-threads".to_string(),
            self.build.thread_arg().to_string(),
        ];
        full.extend(args.iter().cloned());
        full
    }

    fn not_found(name: &str, e: std::io::Error) -> EngineError {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::FileNotFound {
                name: name.to_string(),
            }
        } else {
            EngineError::Io(e)
        }
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    fn build(&self) -> EngineBuild {
        self.build
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        let path = self.resolve(name)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn exec(
        &self,
        args: &[String],
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), EngineError> {
        let mut child = Command::new(&self.ffmpeg_path)
            .args(self.command_args(args))
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::exec_failed(None, "engine stderr not captured"))?;
        let mut reader = BufReader::new(stderr).lines();
        let mut parser = ProgressParser::new(OutputSpan::from_args(args));

        while let Some(line) = reader.next_line().await? {
            if let Some(event) = parser.parse_line(&line) {
                // Receiver going away must not stop the engine.
                let _ = events.send(event);
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(EngineError::exec_failed(
                status.code(),
                format!("ffmpeg exited with {}", status),
            ));
        }

        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.resolve(name)?;
        tokio::fs::read(path)
            .await
            .map_err(|e| Self::not_found(name, e))
    }

    async fn delete(&self, name: &str) -> Result<(), EngineError> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| Self::not_found(name, e))
    }

    async fn shutdown(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            warn!(root = %self.root.display(), error = %e, "Failed to remove engine scratch directory");
        }
    }
}

/// Length of the output relative to the first input's `Duration:`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputSpan {
    /// Output runs as long as the input.
    Input,
    /// Output is capped by an output-side `-t`.
    Fixed(f64),
    /// Synthesized audio is joined to the input.
    InputPlus(f64),
}

impl OutputSpan {
    /// Reads the expected span off the argument vector.
    fn from_args(args: &[String]) -> Self {
        let after_input = args
            .iter()
            .rposition(|arg| arg == "-i")
            .map_or(0, |index| (index + 2).min(args.len()));
        let limit = args[after_input..]
            .windows(2)
            .find(|pair| pair[0] == "-t")
            .and_then(|pair| pair[1].parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs > 0.0);
        if let Some(secs) = limit {
            return Self::Fixed(secs);
        }

        let synthesized: f64 = Regex::new(r"anoisesrc=[^,;\[]*duration=(\d+(?:\.\d+)?)")
            .ok()
            .map(|re| {
                args.iter()
                    .filter_map(|arg| re.captures(arg))
                    .filter_map(|caps| caps[1].parse::<f64>().ok())
                    .sum()
            })
            .unwrap_or(0.0);
        if synthesized > 0.0 {
            Self::InputPlus(synthesized)
        } else {
            Self::Input
        }
    }

    fn total_secs(self, input_secs: Option<f64>) -> Option<f64> {
        match self {
            Self::Input => input_secs,
            Self::Fixed(secs) => Some(secs),
            Self::InputPlus(extra) => input_secs.map(|secs| secs + extra),
        }
    }
}

/// Turns ffmpeg stderr (with `-progress pipe:2`) into engine events.
struct ProgressParser {
    duration_re: Option<Regex>,
    out_time_re: Option<Regex>,
    key_value_re: Option<Regex>,
    span: OutputSpan,
    duration_secs: Option<f64>,
}

impl ProgressParser {
    fn new(span: OutputSpan) -> Self {
        Self {
            duration_re: Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").ok(),
            out_time_re: Regex::new(r"^out_time_(?:us|ms)=(\d+)$").ok(),
            key_value_re: Regex::new(r"^[A-Za-z0-9_]+=\S*$").ok(),
            span,
            duration_secs: None,
        }
    }

    fn parse_line(&mut self, line: &str) -> Option<EngineEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if self.duration_secs.is_none() {
            if let Some(caps) = self.duration_re.as_ref().and_then(|re| re.captures(line)) {
                let hours: f64 = caps[1].parse().unwrap_or(0.0);
                let minutes: f64 = caps[2].parse().unwrap_or(0.0);
                let seconds: f64 = caps[3].parse().unwrap_or(0.0);
                let total = hours * 3600.0 + minutes * 60.0 + seconds;
                if total > 0.0 {
                    self.duration_secs = Some(total);
                }
            }
        }

        if let Some(caps) = self.out_time_re.as_ref().and_then(|re| re.captures(line)) {
            // Both keys report microseconds.
            let micros: f64 = caps[1].parse().unwrap_or(0.0);
            return self
                .span
                .total_secs(self.duration_secs)
                .map(|duration| EngineEvent::Progress(micros / 1_000_000.0 / duration));
        }

        if line == "progress=end" {
            return Some(EngineEvent::Progress(1.0));
        }

        if self
            .key_value_re
            .as_ref()
            .is_some_and(|re| re.is_match(line))
        {
            return None;
        }

        Some(EngineEvent::Log(line.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine_in(dir: &TempDir) -> FfmpegEngine {
        FfmpegEngine {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            log_level: "info".to_string(),
            root: dir.path().to_path_buf(),
            build: EngineBuild::SingleThreaded,
        }
    }

    #[test]
    fn test_parser_progress_from_duration() {
        let mut parser = ProgressParser::new(OutputSpan::Input);
        assert_eq!(
            parser.parse_line("  Duration: 00:03:00.00, start: 0.000000, bitrate: 320 kb/s"),
            Some(EngineEvent::Log(
                "Duration: 00:03:00.00, start: 0.000000, bitrate: 320 kb/s".to_string()
            ))
        );
        assert_eq!(
            parser.parse_line("out_time_us=90000000"),
            Some(EngineEvent::Progress(0.5))
        );
        assert_eq!(
            parser.parse_line("out_time_ms=45000000"),
            Some(EngineEvent::Progress(0.25))
        );
        assert_eq!(parser.parse_line("progress=end"), Some(EngineEvent::Progress(1.0)));
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn test_output_span_from_args() {
        assert_eq!(
            OutputSpan::from_args(&args(&["-i", "in.mp3", "-c:a", "flac", "out.flac"])),
            OutputSpan::Input
        );
        assert_eq!(
            OutputSpan::from_args(&args(&[
                "-ss", "10.000", "-i", "in.mp3", "-t", "30.000", "-map", "0", "out.mp3"
            ])),
            OutputSpan::Fixed(30.0)
        );
        assert_eq!(
            OutputSpan::from_args(&args(&[
                "-i",
                "in.flac",
                "-filter_complex",
                "anoisesrc=color=white:duration=180:amplitude=0.05:sample_rate=44100,aformat=sample_fmts=fltp[noise];[0:a:0]aformat=sample_fmts=fltp[track];[noise][track]concat=n=2:v=0:a=1[out]",
                "out.mp3",
            ])),
            OutputSpan::InputPlus(180.0)
        );
        // An input-side -t says nothing about the output.
        assert_eq!(
            OutputSpan::from_args(&args(&["-t", "5", "-i", "in.mp3", "out.wav"])),
            OutputSpan::Input
        );
    }

    #[test]
    fn test_parser_progress_against_trimmed_output() {
        let mut parser = ProgressParser::new(OutputSpan::Fixed(30.0));
        parser.parse_line("  Duration: 00:10:00.00, start: 0.000000, bitrate: 320 kb/s");
        assert_eq!(
            parser.parse_line("out_time_us=15000000"),
            Some(EngineEvent::Progress(0.5))
        );
    }

    #[test]
    fn test_parser_progress_includes_synthesized_audio() {
        let mut parser = ProgressParser::new(OutputSpan::InputPlus(60.0));
        // Nothing is known until the input duration arrives.
        assert_eq!(parser.parse_line("out_time_us=1000"), None);
        parser.parse_line("  Duration: 00:03:00.00, start: 0.000000, bitrate: 320 kb/s");
        assert_eq!(
            parser.parse_line("out_time_us=120000000"),
            Some(EngineEvent::Progress(0.5))
        );
    }

    #[test]
    fn test_parser_swallows_progress_keys() {
        let mut parser = ProgressParser::new(OutputSpan::Input);
        assert_eq!(parser.parse_line("bitrate=128.0kbits/s"), None);
        assert_eq!(parser.parse_line("speed=41.2x"), None);
        assert_eq!(parser.parse_line("progress=continue"), None);
        assert_eq!(parser.parse_line(""), None);
        // No duration known yet, so no progress either.
        assert_eq!(parser.parse_line("out_time_us=1000"), None);
    }

    #[test]
    fn test_parser_forwards_log_lines() {
        let mut parser = ProgressParser::new(OutputSpan::Input);
        assert_eq!(
            parser.parse_line("Output file #0 does not contain any stream"),
            Some(EngineEvent::Log(
                "Output file #0 does not contain any stream".to_string()
            ))
        );
    }

    #[test]
    fn test_command_args_prefix() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);
        let args = engine.command_args(&["-i".to_string(), "in.mp3".to_string()]);
        assert_eq!(&args[..4], &["-hide_banner", "-nostdin", "-nostats", "-y"]);
        let threads = args.iter().position(|a| a == "-threads").unwrap();
        assert_eq!(args[threads + 1], "1");
        assert_eq!(&args[args.len() - 2..], &["-i", "in.mp3"]);
    }

    #[tokio::test]
    async fn test_virtual_fs_roundtrip() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);

        engine.write("input.mp3", b"abc").await.unwrap();
        assert_eq!(engine.read("input.mp3").await.unwrap(), b"abc");
        engine.delete("input.mp3").await.unwrap();
        assert!(engine.read("input.mp3").await.unwrap_err().is_not_found());
        assert!(engine.delete("input.mp3").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_path_names() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);
        for name in ["", "..", "../escape", "a/b", "a\\b"] {
            assert!(matches!(
                engine.write(name, b"x").await,
                Err(EngineError::InvalidFileName { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_loader_missing_binary() {
        let loader = FfmpegLoader::new(EngineConfig::with_ffmpeg_path(PathBuf::from(
            "/nonexistent/ffmpeg",
        )));
        let err = loader.load(EngineBuild::SingleThreaded).await.err().unwrap();
        assert!(matches!(err, EngineError::BinaryNotFound { .. }));
    }
}
