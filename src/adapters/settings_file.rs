//! Station settings loaded from a JSON file.
//!
//! Read-only: the process never writes the file back.  Only JSON is read.
//! Older installations kept their settings in `stationSettings.yml`; such a
//! file is detected and reported, never parsed, and has to be converted to
//! JSON by hand.

use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::SettingsSource;
use crate::config::StationSettings;
use crate::error::ConfigError;

/// Conventional settings file name, relative to the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = "station-settings.json";

/// YAML settings file written by older installations.
pub const LEGACY_SETTINGS_FILE: &str = "stationSettings.yml";

pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A YAML settings file sitting next to the configured path, if any.
    pub fn legacy_file(&self) -> Option<PathBuf> {
        let legacy = self.path.with_file_name(LEGACY_SETTINGS_FILE);
        legacy.is_file().then_some(legacy)
    }
}

impl SettingsSource for FileSettings {
    fn load(&self) -> Result<StationSettings, ConfigError> {
        let json = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                if let Some(legacy) = self.legacy_file() {
                    warn!(
                        "{} not found; {} is YAML and is not read, convert it to JSON",
                        self.path.display(),
                        legacy.display()
                    );
                }
                ConfigError::NotFound
            }
            _ => ConfigError::IoError,
        })?;
        let settings = StationSettings::from_json(&json)?;
        info!(
            "Loaded settings from {} ({} ports)",
            self.path.display(),
            settings.ports.len()
        );
        Ok(settings)
    }
}
