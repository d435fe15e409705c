//! Path resolution for shoplist configuration and data files.
//!
//! All shoplist data is stored in `~/.shoplist/`:
//! - `config.yaml` - Main configuration file
//! - `shoplist.db` - SQLite database for lists, items, the change queue and history

use std::path::PathBuf;

use crate::error::ShopError;

/// Paths to shoplist configuration and data files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.shoplist/`
    pub root: PathBuf,
    /// Config file: `~/.shoplist/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.shoplist/shoplist.db`
    pub database: PathBuf,
}

impl Paths {
    /// Create paths based on the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, ShopError> {
        let home = std::env::var("HOME")
            .map_err(|_| ShopError::Config("Could not determine home directory".to_string()))?;

        Ok(Self::with_root(PathBuf::from(home).join(".shoplist")))
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("shoplist.db"),
            root,
        }
    }

    /// Use `root` if given, otherwise the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if no root is given and the home directory cannot be
    /// determined.
    pub fn resolve(root: Option<PathBuf>) -> Result<Self, ShopError> {
        root.map_or_else(Self::new, |root| Ok(Self::with_root(root)))
    }

    /// Ensure the root directory exists, creating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), ShopError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| {
                ShopError::Config(format!(
                    "Failed to create directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }
        Ok(())
    }
}
