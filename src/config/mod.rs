//! Configuration management for shoplist.
//!
//! This module handles loading and saving configuration from `~/.shoplist/`.

mod paths;
mod settings;

pub use paths::Paths;
pub use settings::{ColorSetting, Config, GeneralConfig, HistoryConfig, SyncConfig};
