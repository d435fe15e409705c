//! Configuration settings for shoplist.
//!
//! Settings are loaded from `~/.shoplist/config.yaml`.

use serde::{Deserialize, Serialize};

use crate::cli::args::OutputFormat;
use crate::error::ShopError;
use crate::history::DEFAULT_MAX_HISTORY;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Undo/redo history settings.
    pub history: HistoryConfig,
    /// Remote store and synchronization settings.
    pub sync: SyncConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    /// Color output setting.
    #[serde(default = "default_color")]
    pub color: ColorSetting,
}

/// Color output setting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorSetting {
    /// Auto-detect based on terminal.
    #[default]
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

/// Undo/redo history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of actions kept.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Keep the history between runs.
    #[serde(default = "default_true")]
    pub persist: bool,
}

/// Remote store and synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the shopping-list backend. Without one, shoplist works
    /// offline and keeps every change queued.
    #[serde(default)]
    pub backend_url: Option<String>,
    /// Drain the queue as soon as the backend is reachable again.
    #[serde(default = "default_true")]
    pub auto_sync_on_reconnect: bool,
    /// Hold back changes behind a failed change to the same entity.
    #[serde(default = "default_true")]
    pub strict_entity_order: bool,
    /// Timeout for connecting to the backend, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Timeout for a whole request to the backend, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Never contact the backend.
    #[serde(default)]
    pub force_offline: bool,
}

const fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

const fn default_color() -> ColorSetting {
    ColorSetting::Auto
}

const fn default_max_size() -> usize {
    DEFAULT_MAX_HISTORY
}

const fn default_true() -> bool {
    true
}

const fn default_connect_timeout_ms() -> u64 {
    2000
}

const fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: default_output_format(),
            color: default_color(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            persist: true,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            auto_sync_on_reconnect: true,
            strict_entity_order: true,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            force_offline: false,
        }
    }
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ShopError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ShopError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            ShopError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ShopError> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| ShopError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents).map_err(|e| {
            ShopError::Config(format!(
                "Failed to write config file {}: {e}",
                path.display()
            ))
        })
    }
}
