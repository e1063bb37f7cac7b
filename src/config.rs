//! Typed settings persisted as one JSON document.
//!
//! Each setting is declared exactly once as a `Setting<T>` constant and passed
//! by reference to whoever reads or writes it; there is no global registry.
//! Values are checked against the setting's serde shape on both read and
//! write, and a mismatch is a typed validation error, never a coercion.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Declaration of one typed setting: its key and its default value.
pub struct Setting<T> {
    pub name: &'static str,
    default: fn() -> T,
}

impl<T> Setting<T> {
    pub const fn new(name: &'static str, default: fn() -> T) -> Self {
        Setting { name, default }
    }
}

/// Identifier of the capture history container. Written by the store whenever
/// it creates a fresh container, read back on every open.
pub const STORE_CONTAINER_ID: Setting<Option<String>> =
    Setting::new("store_container_id", || None);

/// Roster names the sync cycle captures by default.
pub const ROSTER_NAMES: Setting<Vec<String>> = Setting::new("roster_names", Vec::new);

/// JSON-file-backed settings. Reads load the whole document once; every write
/// flushes it back to disk.
pub struct SettingsStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl SettingsStore {
    /// Open a settings file, starting from an empty document when the file
    /// does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| Error::Validation {
                context: format!("settings file {}", path.display()),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(SettingsStore { path, values })
    }

    /// Open at the platform config location
    /// (~/.config/rosterwatch/settings.json or the platform equivalent).
    pub fn open_default() -> Result<Self> {
        let config_dir = directories::ProjectDirs::from("", "", "rosterwatch")
            .ok_or_else(|| Error::NotFound("platform config directory".to_string()))?
            .config_dir()
            .to_path_buf();
        fs::create_dir_all(&config_dir)?;
        Self::open(config_dir.join("settings.json"))
    }

    /// Read a setting, falling back to its declared default when unset.
    pub fn get<T: DeserializeOwned>(&self, setting: &Setting<T>) -> Result<T> {
        match self.values.get(setting.name) {
            None => Ok((setting.default)()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| Error::Validation {
                    context: format!("setting '{}'", setting.name),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Write a setting and flush the document to disk.
    pub fn set<T: Serialize>(&mut self, setting: &Setting<T>, value: &T) -> Result<()> {
        let encoded = serde_json::to_value(value).map_err(|e| Error::Validation {
            context: format!("setting '{}'", setting.name),
            reason: e.to_string(),
        })?;
        self.values.insert(setting.name.to_string(), encoded);
        let bytes = serde_json::to_vec_pretty(&self.values)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_setting_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsStore::open(dir.path().join("settings.json")).unwrap();
        assert_eq!(settings.get(&STORE_CONTAINER_ID).unwrap(), None);
        assert!(settings.get(&ROSTER_NAMES).unwrap().is_empty());
    }

    #[test]
    fn set_then_get_round_trips_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = SettingsStore::open(&path).unwrap();
        let names = vec!["favorites".to_string(), "queue".to_string()];
        settings.set(&ROSTER_NAMES, &names).unwrap();
        settings
            .set(&STORE_CONTAINER_ID, &Some("7".to_string()))
            .unwrap();

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get(&ROSTER_NAMES).unwrap(), names);
        assert_eq!(
            reopened.get(&STORE_CONTAINER_ID).unwrap(),
            Some("7".to_string())
        );
    }

    #[test]
    fn shape_mismatch_is_a_validation_error_naming_the_setting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, br#"{"roster_names": "not-a-list"}"#).unwrap();

        let settings = SettingsStore::open(&path).unwrap();
        match settings.get(&ROSTER_NAMES).unwrap_err() {
            Error::Validation { context, .. } => assert!(context.contains("roster_names")),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn malformed_settings_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            SettingsStore::open(&path),
            Err(Error::Validation { .. })
        ));
    }
}
