use super::{types::Config, ConfigError};
use crate::format::FormatRegistry;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Default target is a supported format
/// - Storage root and ffmpeg path are set
/// - Converter timeout is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if !FormatRegistry::is_supported(&config.server.default_target) {
        return Err(ConfigError::ValidationError(format!(
            "server.default_target '{}' is not one of: {}",
            config.server.default_target,
            FormatRegistry::supported().join(", ")
        )));
    }

    if config.storage.root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.root cannot be empty".to_string(),
        ));
    }

    // Converter validation
    if config.converter.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "converter.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    if config.converter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
