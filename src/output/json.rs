//! JSON output formatting for shoplist.

use serde::Serialize;
use serde_json::json;

use crate::error::ShopError;
use crate::model::{Item, ShoppingList};
use crate::status::SyncStatus;
use crate::sync::{PendingChange, QueueStats, Submission};

/// Format lists as JSON
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_lists_json(lists: &[ShoppingList]) -> Result<String, ShopError> {
    to_json(&json!({
        "count": lists.len(),
        "lists": lists,
    }))
}

/// Format a list and its items as JSON
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_list_json(list: &ShoppingList, items: &[Item]) -> Result<String, ShopError> {
    to_json(&json!({
        "list": list,
        "count": items.len(),
        "checked": items.iter().filter(|item| item.checked).count(),
        "items": items,
    }))
}

/// Format the result of an edit as JSON
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_edit_json<T: Serialize>(
    value: &T,
    submission: &Submission,
) -> Result<String, ShopError> {
    to_json(&json!({
        "value": value,
        "synced": submission.is_confirmed(),
        "queued": submission.queued,
        "errors": submission.errors,
    }))
}

/// Format a status snapshot as JSON
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_status_json(status: &SyncStatus, stats: &QueueStats) -> Result<String, ShopError> {
    to_json(&json!({
        "status": status.label(),
        "online": status.is_online,
        "syncing": status.syncing,
        "lastSync": status.last_sync.map(|t| t.to_rfc3339()),
        "errors": status.errors,
        "pending": stats.pending,
        "failing": stats.failing,
        "oldestPending": stats.oldest_pending.map(|t| t.to_rfc3339()),
    }))
}

/// Format queued changes as JSON
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn format_queue_json(changes: &[PendingChange], total: usize) -> Result<String, ShopError> {
    to_json(&json!({
        "total": total,
        "count": changes.len(),
        "changes": changes,
    }))
}

/// Serialize any value as pretty-printed JSON
///
/// # Errors
///
/// Returns `ShopError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, ShopError> {
    Ok(serde_json::to_string_pretty(value)?)
}
