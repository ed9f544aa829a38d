//! Settings loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::settings::schema::SidecarSettings;
use crate::settings::validation::validate_settings;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<SidecarSettings, SettingsError> {
    let content = fs::read_to_string(path)?;
    let settings: SidecarSettings = toml::from_str(&content)?;
    validate_settings(&settings).map_err(SettingsError::Validation)?;
    Ok(settings)
}
