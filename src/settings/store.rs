//! Settings file read/write operations

use super::schema::StreamerSettings;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Settings-related errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Load settings from a JSON file. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<StreamerSettings, SettingsError> {
    if !path.exists() {
        tracing::debug!("No settings at {:?}, using defaults", path);
        return Ok(StreamerSettings::default());
    }

    let content = fs::read_to_string(path)?;
    let settings: StreamerSettings = serde_json::from_str(&content)?;
    settings.validate().map_err(SettingsError::Invalid)?;

    tracing::debug!("Loaded settings from {:?}", path);
    Ok(settings)
}

/// Write settings as pretty JSON, creating parent directories
pub fn save_settings(settings: &StreamerSettings, path: &Path) -> Result<(), SettingsError> {
    settings.validate().map_err(SettingsError::Invalid)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(path, content)?;

    tracing::debug!("Saved settings to {:?}", path);
    Ok(())
}
