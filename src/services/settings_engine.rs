// ReMarkable Settings Engine
// Loads, saves and updates application settings.
// Settings are stored as a JSON file at the platform-specific config path.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::AppSettings;

pub const HOST_ENV: &str = "REMARKABLE_HOST";
pub const PORT_ENV: &str = "REMARKABLE_PORT";

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<AppSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &AppSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &Path;
}

/// Settings engine that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: PathBuf,
    settings: AppSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses `settings.json` in the platform config directory.
    pub fn new(path_override: Option<PathBuf>) -> Self {
        let config_path =
            path_override.unwrap_or_else(|| platform::get_config_dir().join("settings.json"));

        Self {
            config_path,
            settings: AppSettings::default(),
        }
    }

    /// Applies `REMARKABLE_HOST` and `REMARKABLE_PORT` on top of the loaded settings.
    ///
    /// Overrides are not persisted. An unparsable port is ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = env::var(HOST_ENV) {
            info!("{HOST_ENV} set, binding to {host}");
            self.settings.server.host = host;
        }
        if let Ok(port) = env::var(PORT_ENV) {
            match port.parse() {
                Ok(port) => self.settings.server.port = port,
                Err(e) => warn!("Invalid {PORT_ENV} value {port:?}: {e}"),
            }
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    fn load(&mut self) -> Result<AppSettings, SettingsError> {
        if !self.config_path.exists() {
            info!(
                "No settings file at {}, using defaults",
                self.config_path.display()
            );
            self.settings = AppSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| SettingsError::Io(format!("Failed to read config file: {}", e)))?;

        let settings: AppSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::Serialization(format!("Failed to parse config file: {}", e))
        })?;

        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Saves the current settings, creating parent directories as needed.
    fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::Io(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::Serialization(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(&self.config_path, json)
            .map_err(|e| SettingsError::Io(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Updates one setting by dot-notation key path (`"form.debounce_ms"`) and saves.
    ///
    /// The whole settings tree is round-tripped through `serde_json::Value`
    /// so a value of the wrong type is rejected by deserialization.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::Serialization(format!("Failed to serialize settings: {}", e))
        })?;

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (parents.split('.').collect::<Vec<_>>(), leaf),
            None => (Vec::new(), key),
        };

        let mut current = &mut json_value;
        for part in parents {
            current = current
                .get_mut(part)
                .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        }
        match current {
            serde_json::Value::Object(map) if map.contains_key(leaf) => {
                map.insert(leaf.to_string(), value);
            }
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }

        self.settings =
            serde_json::from_value(json_value).map_err(|e| SettingsError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        self.save()
    }

    /// Resets all settings to defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = AppSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &Path {
        &self.config_path
    }
}
