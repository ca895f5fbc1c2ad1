//! The `ollama.config.json` settings file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Tool;

/// File name looked up in the working directory.
pub const SETTINGS_FILE_NAME: &str = "ollama.config.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Preferences shared by every chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default)]
    pub default_model: String,
    #[serde(default)]
    pub vision_enabled: bool,
    #[serde(default)]
    pub ipython_enabled: bool,
    #[serde(default)]
    pub tools_enabled: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_model: "llama3.2".to_string(),
            vision_enabled: false,
            ipython_enabled: false,
            tools_enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub global_settings: GlobalSettings,
    /// Tool definitions as written in the file; see [`Settings::tools`].
    #[serde(default)]
    pub default_tools: Vec<Value>,
}

impl Settings {
    /// Path of the settings file in the current working directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from(SETTINGS_FILE_NAME)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or return defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Write as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// The tool definitions that parse as [`Tool`]. Tools are only offered
    /// when `toolsEnabled` is set.
    pub fn tools(&self) -> Vec<Tool> {
        if !self.global_settings.tools_enabled {
            return Vec::new();
        }
        self.default_tools
            .iter()
            .filter_map(|value| match serde_json::from_value::<Tool>(value.clone()) {
                Ok(tool) => Some(tool),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping malformed tool definition");
                    None
                }
            })
            .collect()
    }
}
