//! Host capability probing and engine build selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;

use super::config::EngineConfig;

/// Engine build variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineBuild {
    /// Worker-thread build, used when every required feature is present.
    MultiThreaded,
    /// Baseline single-worker build.
    SingleThreaded,
}

impl EngineBuild {
    /// Value passed to the engine's `-threads` option.
    pub fn thread_arg(&self) -> &'static str {
        match self {
            Self::MultiThreaded => "0",
            Self::SingleThreaded => "1",
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MultiThreaded => "multi",
            Self::SingleThreaded => "single",
        }
    }
}

impl fmt::Display for EngineBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiThreaded => f.write_str("multi-threaded"),
            Self::SingleThreaded => f.write_str("single-threaded"),
        }
    }
}

/// Features the multi-threaded build depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFeatures {
    /// CPUs available to this process.
    pub available_cores: usize,
    /// Threading permitted by configuration.
    pub threading_allowed: bool,
    /// Engine binary built with thread support.
    pub engine_threads: bool,
}

impl HostFeatures {
    /// Probes the host and the configured engine binary.
    pub async fn detect(config: &EngineConfig) -> Self {
        let available_cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let output = Command::new(&config.ffmpeg_path)
            .args(["-hide_banner", "-buildconf"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        let engine_threads = match output {
            Ok(o) if o.status.success() => {
                let stdout = String::from_utf8_lossy(&o.stdout);
                !stdout.contains("--disable-pthreads") && !stdout.contains("--disable-w32threads")
            }
            _ => false,
        };

        Self {
            available_cores,
            threading_allowed: config.allow_multi_threaded,
            engine_threads,
        }
    }

    /// Names of required features that are absent.
    pub fn missing_features(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.available_cores < 2 {
            missing.push("multiple cores");
        }
        if !self.threading_allowed {
            missing.push("threading allowed");
        }
        if !self.engine_threads {
            missing.push("engine thread support");
        }
        missing
    }
}

/// Picks the multi-threaded build only if no required feature is missing.
pub fn select_build(features: &HostFeatures) -> EngineBuild {
    if features.missing_features().is_empty() {
        EngineBuild::MultiThreaded
    } else {
        EngineBuild::SingleThreaded
    }
}
