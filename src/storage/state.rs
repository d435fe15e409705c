//! Key/value session state.

use std::sync::Arc;

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::ShopError;

/// Serialized action history.
pub const HISTORY_KEY: &str = "history";
/// Connectivity observed at the end of the previous session ("true"/"false").
pub const LAST_ONLINE_KEY: &str = "last_online";

pub struct AppState {
    db: Arc<Database>,
}

impl AppState {
    #[must_use]
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, key: &str) -> Result<Option<String>, ShopError> {
        let conn = self.db.connection()?;
        let value = conn
            .query_row("SELECT value FROM app_state WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| ShopError::Database(format!("Failed to read state '{key}': {e}")))?;
        Ok(value)
    }

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set(&self, key: &str, value: &str) -> Result<(), ShopError> {
        let conn = self.db.connection()?;
        conn.execute(
            r"INSERT INTO app_state (key, value) VALUES (?1, ?2)
              ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|e| ShopError::Database(format!("Failed to write state '{key}': {e}")))?;
        Ok(())
    }

    /// Delete a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(&self, key: &str) -> Result<(), ShopError> {
        let conn = self.db.connection()?;
        conn.execute("DELETE FROM app_state WHERE key = ?1", [key])
            .map_err(|e| ShopError::Database(format!("Failed to delete state '{key}': {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let state = AppState::new(Arc::new(Database::open_in_memory().unwrap()));

        assert!(state.get(LAST_ONLINE_KEY).unwrap().is_none());

        state.set(LAST_ONLINE_KEY, "false").unwrap();
        state.set(LAST_ONLINE_KEY, "true").unwrap();
        assert_eq!(state.get(LAST_ONLINE_KEY).unwrap().as_deref(), Some("true"));

        state.remove(LAST_ONLINE_KEY).unwrap();
        assert!(state.get(LAST_ONLINE_KEY).unwrap().is_none());
    }
}
