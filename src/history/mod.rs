//! Undo/redo history.
//!
//! The [`ActionLog`] only keeps track of what was done. The
//! [`HistoryExecutor`] turns the present action into remote-store changes
//! and advances the log once they went through.

mod action;
mod executor;
mod log;

use std::sync::{Mutex, MutexGuard};

pub use action::{Action, ActionKind, ActionPayload, Plan};
pub use executor::{HistoryExecutor, HistoryOutcome};
pub use log::{ActionLog, DEFAULT_MAX_HISTORY};

use crate::error::ShopError;

/// Lock a shared action log.
///
/// # Errors
///
/// Returns an error if a previous holder panicked.
pub fn lock(log: &Mutex<ActionLog>) -> Result<MutexGuard<'_, ActionLog>, ShopError> {
    log.lock()
        .map_err(|_| ShopError::Poisoned("action log".to_string()))
}
