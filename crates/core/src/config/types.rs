use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::engine::EngineConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub defaults: OperationDefaults,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for one multipart request body, in MiB.
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_mb() -> u64 {
    512
}

/// Values used when a request leaves a parameter out.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperationDefaults {
    /// Bitrate for lossy encodes, e.g. "192k".
    #[serde(default = "default_bitrate")]
    pub bitrate: String,
    /// Silence threshold in dBFS for trims with silence removal.
    #[serde(default = "default_silence_threshold_db")]
    pub silence_threshold_db: f64,
    /// Minimum silence length in seconds.
    #[serde(default = "default_silence_duration_secs")]
    pub silence_duration_secs: f64,
}

impl Default for OperationDefaults {
    fn default() -> Self {
        Self {
            bitrate: default_bitrate(),
            silence_threshold_db: default_silence_threshold_db(),
            silence_duration_secs: default_silence_duration_secs(),
        }
    }
}

fn default_bitrate() -> String {
    "192k".to_string()
}

fn default_silence_threshold_db() -> f64 {
    -50.0
}

fn default_silence_duration_secs() -> f64 {
    0.5
}

/// Config for API responses (host paths reduced to what callers need)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub engine: SanitizedEngineConfig,
    pub defaults: OperationDefaults,
}

/// Engine settings without filesystem locations
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEngineConfig {
    /// File name of the engine binary.
    pub binary: String,
    pub allow_multi_threaded: bool,
    pub log_level: String,
    pub log_tail_lines: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            engine: SanitizedEngineConfig {
                binary: config
                    .engine
                    .ffmpeg_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                allow_multi_threaded: config.engine.allow_multi_threaded,
                log_level: config.engine.log_level.clone(),
                log_tail_lines: config.engine.log_tail_lines,
            },
            defaults: config.defaults.clone(),
        }
    }
}
