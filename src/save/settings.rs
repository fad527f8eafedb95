//! Save system settings
//!
//! Everything has a default; a JSON file may override any subset of keys.
//!
//! ```text
//! <root_dir>/
//! ├── PlayerSettings.json
//! └── Saves/
//!     ├── Slot 1.savinfo
//!     ├── Slot 1.sav
//!     └── ...
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{FileKind, SaveError};
use super::version::GameVersion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSettings {
    pub root_dir: PathBuf,
    pub saves_folder: String,
    pub data_extension: String,
    pub info_extension: String,
    pub player_settings_name: String,
    pub quick_save_prefix: String,
    /// Saves written by older versions are listed but never quick-loaded
    pub earliest_supported_version: String,
    /// Written into every new save
    pub app_version: String,
    /// Session made current at startup, if any
    pub default_session_name: Option<String>,
}

impl Default for SaveSettings {
    fn default() -> Self {
        SaveSettings {
            root_dir: default_root_dir(),
            saves_folder: "Saves".to_string(),
            data_extension: ".sav".to_string(),
            info_extension: ".savinfo".to_string(),
            player_settings_name: "PlayerSettings".to_string(),
            quick_save_prefix: "Quicksave".to_string(),
            earliest_supported_version: "0.0.1".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            default_session_name: None,
        }
    }
}

fn default_root_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("savekit")
}

impl SaveSettings {
    /// Defaults rooted at `root_dir`
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        SaveSettings {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Reads settings from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SaveError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let settings: SaveSettings = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects settings that would produce ambiguous or unusable paths
    pub fn validate(&self) -> Result<(), SaveError> {
        if self.info_extension.is_empty() || self.data_extension.is_empty() {
            return Err(SaveError::Settings("file extensions must not be empty".into()));
        }
        if self.info_extension == self.data_extension {
            return Err(SaveError::Settings(format!(
                "info and data files share the extension '{}'",
                self.info_extension
            )));
        }
        if GameVersion::parse(&self.earliest_supported_version).is_none() {
            return Err(SaveError::Settings(format!(
                "earliest supported version '{}' is not a dotted number",
                self.earliest_supported_version
            )));
        }
        Ok(())
    }

    pub fn save_folder_path(&self) -> PathBuf {
        self.root_dir.join(&self.saves_folder)
    }

    pub fn player_settings_path(&self) -> PathBuf {
        self.root_dir.join(format!("{}.json", self.player_settings_name))
    }

    pub fn extension(&self, kind: FileKind) -> &str {
        match kind {
            FileKind::Info => &self.info_extension,
            FileKind::Data => &self.data_extension,
        }
    }
}
