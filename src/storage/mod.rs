//! Storage layer for shoplist.
//!
//! This module provides SQLite-based persistence for:
//! - Local copies of lists and items
//! - The pending-change queue
//! - Small pieces of session state (action history, last connectivity)

mod database;
mod local;
mod migrations;
mod state;

pub use database::Database;
pub use local::LocalStore;
pub use state::{AppState, HISTORY_KEY, LAST_ONLINE_KEY};
