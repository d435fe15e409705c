//! shoplist - offline-first shopping lists
//!
//! This crate keeps shopping lists in a local `SQLite` database, queues edits
//! made while the backend is unreachable and replays them in order once it
//! is reachable again. Every edit is recorded in a bounded undo/redo log
//! whose inverse operations go through the same send-or-queue path.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod history;
pub mod model;
pub mod notify;
pub mod output;
pub mod remote;
pub mod session;
pub mod status;
pub mod storage;
pub mod sync;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::ShopError;
pub use session::{SessionOptions, ShoppingSession};
