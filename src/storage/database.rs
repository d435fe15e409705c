//! `SQLite` database connection.
//!
//! The database is stored at `~/.shoplist/shoplist.db` and holds the local
//! mirror of lists and items, the pending-change queue and session state.

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::error::ShopError;

use super::migrations;

/// Database connection wrapper.
///
/// The connection sits behind a mutex so the queue, the local store and the
/// sync engine can share one handle across tasks.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at a specific path.
    ///
    /// Creates the database file and runs migrations if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_at(path: &std::path::Path) -> Result<Self, ShopError> {
        let conn = Connection::open(path).map_err(|e| {
            ShopError::Database(format!("Failed to open database {}: {e}", path.display()))
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self, ShopError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            ShopError::Database(format!("Failed to open in-memory database: {e}"))
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, ShopError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| ShopError::Database(format!("Failed to enable foreign keys: {e}")))?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, ShopError> {
        migrations::get_version(&*self.connection()?)
    }

    /// Lock the underlying connection.
    ///
    /// Never hold the guard across an `.await`.
    ///
    /// # Errors
    ///
    /// Returns an error if a previous holder panicked.
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>, ShopError> {
        self.conn
            .lock()
            .map_err(|_| ShopError::Database("Database connection lock poisoned".to_string()))
    }
}
