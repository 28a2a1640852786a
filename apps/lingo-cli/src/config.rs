//! Configuration for the lingo CLI.

use lingo_quota::QuotaLimits;
use lingo_recall::{StopList, DEFAULT_STOP_CODES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub recall: RecallConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    /// Load from `path`. A missing or malformed file yields defaults.
    pub fn load_from(path: &std::path::Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lingo")
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// Where the preference store lives for the configured backend.
    pub fn prefs_path(&self) -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lingo")
            .map(|d| d.data_dir().join(self.storage.backend.file_name()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// AI paragraph generation.
    #[serde(default)]
    pub ai: QuotaLimits,
    /// Text-to-speech playback.
    #[serde(default = "default_tts_limits")]
    pub tts: QuotaLimits,
}

fn default_tts_limits() -> QuotaLimits {
    QuotaLimits::new(100, 500)
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            ai: QuotaLimits::default(),
            tts: default_tts_limits(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    #[serde(default = "default_stops")]
    pub stops: Vec<String>,
    #[serde(default = "default_exam")]
    pub exam: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_stops() -> Vec<String> {
    DEFAULT_STOP_CODES.iter().map(|c| c.to_string()).collect()
}
fn default_exam() -> String { "general".to_string() }
fn default_language() -> String { "en".to_string() }

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            stops: default_stops(),
            exam: default_exam(),
            language: default_language(),
        }
    }
}

impl RecallConfig {
    /// Preference key holding the item list for the selected exam and language.
    pub fn storage_key(&self) -> String {
        format!("recall_items_{}_{}", self.exam, self.language)
    }

    /// Parsed stops, or the defaults if the configured list is invalid.
    pub fn stop_list(&self) -> StopList {
        match StopList::new(self.stops.iter().cloned()) {
            Ok(stops) => stops,
            Err(e) => {
                log::warn!("Invalid recall stops {:?}, using defaults: {}", self.stops, e);
                StopList::default()
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

impl StorageBackend {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Json => "prefs.json",
            Self::Sqlite => "prefs.db",
        }
    }
}
