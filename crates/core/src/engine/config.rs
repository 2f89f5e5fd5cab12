//! Configuration for the engine module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the FFmpeg-backed engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Directory holding per-engine scratch filesystems.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Whether the multi-threaded build may be selected.
    #[serde(default = "default_true")]
    pub allow_multi_threaded: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Engine log lines attached to execution failures.
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: usize,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("audiokit-engine")
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_tail_lines() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            work_dir: default_work_dir(),
            allow_multi_threaded: true,
            log_level: default_log_level(),
            log_tail_lines: default_log_tail_lines(),
        }
    }
}

impl EngineConfig {
    /// Creates a config with a custom ffmpeg path.
    pub fn with_ffmpeg_path(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ..Default::default()
        }
    }

    /// Sets the scratch directory root.
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Forces the single-threaded build.
    pub fn single_threaded(mut self) -> Self {
        self.allow_multi_threaded = false;
        self
    }
}
