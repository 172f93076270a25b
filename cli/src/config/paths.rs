//! Platform-specific path utilities for the courier CLI.

use std::path::PathBuf;

use crate::error::{CourierError, Result};

/// Get the configuration directory for courier.
///
/// - Linux: `~/.config/courier`
/// - macOS: `~/Library/Application Support/courier`
/// - Windows: `%APPDATA%\courier`
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| CourierError::Config("Cannot determine config directory".to_string()))?;
    Ok(base.join("courier"))
}

/// Get the main configuration file path.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}
