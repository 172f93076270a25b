//! Configuration management for the courier CLI.

pub mod paths;
pub mod settings;

pub use paths::config_file;
pub use settings::{ApiConfig, CourierConfig};

use std::path::Path;

use crate::error::Result;

/// Load configuration from the default config file.
///
/// If the config file doesn't exist, returns default configuration.
pub fn load_config() -> Result<CourierConfig> {
    let path = config_file()?;
    load_config_from(&path)
}

/// Load configuration from a specific path.
///
/// If the file doesn't exist, returns default configuration.
pub fn load_config_from(path: &Path) -> Result<CourierConfig> {
    if !path.exists() {
        return Ok(CourierConfig::default().with_env_overrides());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: CourierConfig = toml::from_str(&contents)?;

    Ok(config.with_env_overrides())
}

/// Save configuration to the default config file.
#[allow(dead_code)]
pub fn save_config(config: &CourierConfig) -> Result<()> {
    paths::ensure_config_dir()?;
    let path = config_file()?;
    save_config_to(config, &path)
}

/// Save configuration to a specific path.
pub fn save_config_to(config: &CourierConfig, path: &Path) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("nope.toml")).unwrap();

        assert_eq!(config.api.base_url.as_str(), "https://api.courier.chat/");
        assert_eq!(config.login.timeout_secs, 300);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = CourierConfig::default();
        config.api.timeout_secs = 10;
        config.login.timeout_secs = 60;
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.api.timeout_secs, 10);
        assert_eq!(loaded.login.timeout_secs, 60);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api = not toml").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, crate::error::CourierError::ConfigRead(_)));
    }
}
