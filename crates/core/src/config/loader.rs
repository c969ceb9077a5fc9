use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable prefix for overrides.
///
/// Nested keys use a double underscore: `TUNESHIFT_CONVERTER__FFMPEG_PATH`.
pub const ENV_PREFIX: &str = "TUNESHIFT_";

/// Provider chain for a config file: the TOML file, then `TUNESHIFT_*`
/// environment variables on top.
pub fn config_figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    extract(config_figment(path))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    figment
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", content).unwrap();
        temp_file
    }

    #[test]
    fn test_load_config_from_str_valid() {
        let config = load_config_from_str("[server]\ndefault_target = \"flac\"\n").unwrap();
        assert_eq!(config.server.default_target, "flac");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let err = load_config_from_str("[converter]\ntimeout_secs = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config(Path::new("/nonexistent/tuneshift.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(ref p) if p.contains("tuneshift.toml")));
    }

    #[test]
    fn test_load_config_from_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "tuneshift.toml",
                r#"
[storage]
root = "/srv/tuneshift"

[converter]
ffmpeg_log_level = "warning"
"#,
            )?;

            let config = load_config(Path::new("tuneshift.toml")).unwrap();
            assert_eq!(config.storage.root.to_str().unwrap(), "/srv/tuneshift");
            assert_eq!(config.converter.ffmpeg_log_level, "warning");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "tuneshift.toml",
                "[converter]\ntimeout_secs = 30\nffmpeg_path = \"/opt/ffmpeg\"\n",
            )?;
            jail.set_env("TUNESHIFT_CONVERTER__TIMEOUT_SECS", "5");
            jail.set_env("TUNESHIFT_CONVERTER__FFMPEG_PATH", "/x");
            // Variables outside the config shape are ignored.
            jail.set_env("TUNESHIFT_CONFIG", "elsewhere.toml");

            let config = load_config(Path::new("tuneshift.toml")).unwrap();
            assert_eq!(config.converter.timeout_secs, 5);
            assert_eq!(config.converter.ffmpeg_path.to_str().unwrap(), "/x");
            Ok(())
        });
    }

    #[test]
    fn test_env_override_with_wrong_type_is_parse_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("tuneshift.toml", "")?;
            jail.set_env("TUNESHIFT_SERVER__PORT", "eighty");

            let err = load_config(Path::new("tuneshift.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError(_)));
            Ok(())
        });
    }

    #[test]
    fn test_later_providers_override_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "tuneshift.toml",
                "[converter]\ntimeout_secs = 30\nffmpeg_path = \"/opt/ffmpeg\"\n",
            )?;

            let config = extract(
                config_figment(Path::new("tuneshift.toml")).merge(("converter.timeout_secs", 5)),
            )
            .unwrap();

            assert_eq!(config.converter.timeout_secs, 5);
            assert_eq!(config.converter.ffmpeg_path.to_str().unwrap(), "/opt/ffmpeg");
            Ok(())
        });
    }

    #[test]
    fn test_override_with_wrong_type_is_parse_error() {
        let file = config_file("");
        let err = extract(config_figment(file.path()).merge(("server.port", "eighty")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
