//! Output formatting for shoplist.
//!
//! This module provides formatters for displaying lists, items, history and
//! sync state in various formats.

mod json;
mod pretty;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::ShopError;
use crate::model::{Item, ShoppingList};
use crate::session::HistorySnapshot;
use crate::status::SyncStatus;
use crate::sync::{DrainOutcome, PendingChange, QueueStats, Submission};

pub use json::*;
pub use pretty::*;

/// Format lists based on output format
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_lists(lists: &[ShoppingList], format: OutputFormat) -> Result<String, ShopError> {
    match format {
        OutputFormat::Pretty => Ok(format_lists_pretty(lists)),
        OutputFormat::Json => format_lists_json(lists),
    }
}

/// Format a list and its items based on output format
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_list(
    list: &ShoppingList,
    items: &[Item],
    format: OutputFormat,
) -> Result<String, ShopError> {
    match format {
        OutputFormat::Pretty => Ok(format_list_pretty(list, items)),
        OutputFormat::Json => format_list_json(list, items),
    }
}

/// Format the result of an edit based on output format
///
/// `message` is only shown in pretty output; JSON carries `value`.
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_edit<T: Serialize>(
    message: &str,
    value: &T,
    submission: &Submission,
    format: OutputFormat,
) -> Result<String, ShopError> {
    match format {
        OutputFormat::Pretty => Ok(format_edit_pretty(message, submission)),
        OutputFormat::Json => format_edit_json(value, submission),
    }
}

/// Format the action log based on output format
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_history(history: &HistorySnapshot, format: OutputFormat) -> Result<String, ShopError> {
    match format {
        OutputFormat::Pretty => Ok(format_history_pretty(history)),
        OutputFormat::Json => to_json(history),
    }
}

/// Format the synchronization status based on output format
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_status(
    status: &SyncStatus,
    stats: &QueueStats,
    format: OutputFormat,
) -> Result<String, ShopError> {
    match format {
        OutputFormat::Pretty => Ok(format_status_pretty(status, stats)),
        OutputFormat::Json => format_status_json(status, stats),
    }
}

/// Format queued changes based on output format
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_queue(
    changes: &[PendingChange],
    total: usize,
    format: OutputFormat,
) -> Result<String, ShopError> {
    match format {
        OutputFormat::Pretty => Ok(format_queue_pretty(changes, total)),
        OutputFormat::Json => format_queue_json(changes, total),
    }
}

/// Format a drain outcome based on output format
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_drain(outcome: &DrainOutcome, format: OutputFormat) -> Result<String, ShopError> {
    match format {
        OutputFormat::Pretty => Ok(format_drain_pretty(outcome)),
        OutputFormat::Json => to_json(outcome),
    }
}
