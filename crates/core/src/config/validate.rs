use super::{types::Config, ConfigError};
use crate::format::Bitrate;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upload limit is not 0
/// - Engine keeps at least one log line for diagnostics
/// - Default bitrate parses
/// - Default silence duration is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }
    if config.server.max_upload_mb == 0 {
        return Err(ConfigError::ValidationError(
            "server.max_upload_mb cannot be 0".to_string(),
        ));
    }

    // Engine validation
    if config.engine.log_tail_lines == 0 {
        return Err(ConfigError::ValidationError(
            "engine.log_tail_lines cannot be 0".to_string(),
        ));
    }

    // Defaults validation
    config
        .defaults
        .bitrate
        .parse::<Bitrate>()
        .map_err(|e| ConfigError::ValidationError(format!("defaults.bitrate: {}", e)))?;
    let silence = config.defaults.silence_duration_secs;
    if silence.is_nan() || silence <= 0.0 {
        return Err(ConfigError::ValidationError(
            "defaults.silence_duration_secs must be positive".to_string(),
        ));
    }

    Ok(())
}
