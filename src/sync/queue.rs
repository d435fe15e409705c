//! Pending-change queue storage.
//!
//! Provides durable FIFO persistence of changes the remote store has not
//! confirmed yet.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

use super::change::{ChangeOp, IdResolution, PendingChange};
use crate::error::ShopError;
use crate::storage::Database;

const SELECT_COLUMNS: &str = r"SELECT id, change_id, payload, created_at, attempts,
                                      last_attempt, last_error
                               FROM pending_changes";

/// Durable queue of unconfirmed changes.
pub struct PendingQueue {
    db: Arc<Database>,
}

impl PendingQueue {
    /// Create a queue over an open database.
    #[must_use]
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a change to the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be saved.
    pub fn enqueue(&self, change: &mut PendingChange) -> Result<(), ShopError> {
        let payload = serde_json::to_string(&change.op)?;
        let conn = self.db.connection()?;

        conn.execute(
            r"INSERT INTO pending_changes
              (change_id, operation, entity, target, payload, created_at,
               attempts, last_attempt, last_error)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                change.change_id.to_string(),
                change.op.name(),
                change.op.entity().as_str(),
                change.op.target().to_string(),
                payload,
                change.created_at.to_rfc3339(),
                change.attempts,
                change.last_attempt.map(|t| t.to_rfc3339()),
                change.last_error,
            ],
        )
        .map_err(|e| ShopError::Database(format!("Failed to enqueue change: {e}")))?;

        change.id = Some(conn.last_insert_rowid());
        Ok(())
    }

    /// Get every queued change in the order it was enqueued.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn pending(&self) -> Result<Vec<PendingChange>, ShopError> {
        let conn = self.db.connection()?;

        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))
            .map_err(|e| ShopError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], row_to_change)
            .map_err(|e| ShopError::Database(format!("Failed to query pending changes: {e}")))?;

        let mut changes = Vec::new();
        for row in rows {
            changes.push(row.map_err(|e| ShopError::Database(e.to_string()))?);
        }

        Ok(changes)
    }

    /// Get a specific change by queue id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, id: i64) -> Result<Option<PendingChange>, ShopError> {
        let conn = self.db.connection()?;

        let result = conn
            .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), [id], row_to_change)
            .optional()
            .map_err(|e| ShopError::Database(format!("Failed to query change: {e}")))?;

        Ok(result)
    }

    /// Remove a change the remote store confirmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(&self, id: i64) -> Result<bool, ShopError> {
        let conn = self.db.connection()?;

        let rows = conn
            .execute("DELETE FROM pending_changes WHERE id = ?1", [id])
            .map_err(|e| ShopError::Database(format!("Failed to remove change: {e}")))?;

        Ok(rows > 0)
    }

    /// Increment attempt count and record the error, keeping the change queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn record_failure(&self, id: i64, error: &str) -> Result<(), ShopError> {
        let conn = self.db.connection()?;

        conn.execute(
            r"UPDATE pending_changes SET
              last_attempt = ?1,
              last_error = ?2,
              attempts = attempts + 1
              WHERE id = ?3",
            params![Utc::now().to_rfc3339(), error, id],
        )
        .map_err(|e| ShopError::Database(format!("Failed to record attempt: {e}")))?;

        Ok(())
    }

    /// Point queued changes that reference a placeholder at its real id.
    ///
    /// Returns the number of rewritten changes.
    ///
    /// # Errors
    ///
    /// Returns an error if a query or update fails.
    pub fn retarget(&self, resolution: &IdResolution) -> Result<usize, ShopError> {
        let mut rewritten = 0;

        for mut change in self.pending()? {
            if !change.op.references().contains(&resolution.placeholder) {
                continue;
            }
            change.op.retarget(resolution.placeholder, resolution.id);
            self.rewrite(&change)?;
            rewritten += 1;
        }

        Ok(rewritten)
    }

    fn rewrite(&self, change: &PendingChange) -> Result<(), ShopError> {
        let payload = serde_json::to_string(&change.op)?;
        let conn = self.db.connection()?;

        conn.execute(
            "UPDATE pending_changes SET target = ?1, payload = ?2 WHERE id = ?3",
            params![change.op.target().to_string(), payload, change.id],
        )
        .map_err(|e| ShopError::Database(format!("Failed to rewrite change: {e}")))?;

        Ok(())
    }

    /// Number of queued changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn len(&self) -> Result<usize, ShopError> {
        let conn = self.db.connection()?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM pending_changes", [], |row| row.get(0))
            .map_err(|e| ShopError::Database(format!("Failed to count pending changes: {e}")))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Check if the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn is_empty(&self) -> Result<bool, ShopError> {
        Ok(self.len()? == 0)
    }

    /// Get queue statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn stats(&self) -> Result<QueueStats, ShopError> {
        let conn = self.db.connection()?;

        let pending: i64 = conn
            .query_row("SELECT COUNT(*) FROM pending_changes", [], |row| row.get(0))
            .map_err(|e| ShopError::Database(format!("Failed to count pending: {e}")))?;

        let failing: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pending_changes WHERE last_error IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .map_err(|e| ShopError::Database(format!("Failed to count failing: {e}")))?;

        let oldest_pending: Option<String> = conn
            .query_row(
                "SELECT created_at FROM pending_changes ORDER BY id ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ShopError::Database(format!("Failed to get oldest pending: {e}")))?;

        Ok(QueueStats {
            pending,
            failing,
            oldest_pending: oldest_pending
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|t| t.with_timezone(&Utc)),
        })
    }

    /// Drop every queued change. The dropped mutations never reach the remote store.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear(&self) -> Result<usize, ShopError> {
        let conn = self.db.connection()?;

        conn.execute("DELETE FROM pending_changes", [])
            .map_err(|e| ShopError::Database(format!("Failed to clear queue: {e}")))
    }
}

/// Queue statistics.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    /// Number of queued changes
    pub pending: i64,
    /// Number of queued changes whose last attempt failed
    pub failing: i64,
    /// Oldest queued change timestamp
    pub oldest_pending: Option<DateTime<Utc>>,
}

fn conversion_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_change(row: &Row<'_>) -> Result<PendingChange, rusqlite::Error> {
    let id: i64 = row.get(0)?;
    let change_id_str: String = row.get(1)?;
    let payload: String = row.get(2)?;
    let created_at_str: String = row.get(3)?;
    let attempts: i32 = row.get(4)?;
    let last_attempt_str: Option<String> = row.get(5)?;
    let last_error: Option<String> = row.get(6)?;

    let change_id = Uuid::parse_str(&change_id_str).map_err(|e| conversion_error(1, e))?;
    let op: ChangeOp = serde_json::from_str(&payload).map_err(|e| conversion_error(2, e))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_or_else(|_| Utc::now(), |t| t.with_timezone(&Utc));

    let last_attempt = last_attempt_str.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
    });

    Ok(PendingChange {
        id: Some(id),
        change_id,
        op,
        created_at,
        attempts,
        last_attempt,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityId, ItemPatch, NewItem};

    fn create_test_queue() -> PendingQueue {
        let db = Database::open_in_memory().unwrap();
        PendingQueue::new(Arc::new(db))
    }

    fn delete_item(id: i64) -> PendingChange {
        PendingChange::new(ChangeOp::DeleteItem {
            item_id: EntityId::Remote(id),
        })
    }

    #[test]
    fn test_enqueue_and_get() {
        let queue = create_test_queue();

        let mut change = delete_item(5);
        queue.enqueue(&mut change).unwrap();
        assert!(change.id.is_some());

        let loaded = queue.get(change.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.op, change.op);
        assert_eq!(loaded.change_id, change.change_id);
        assert_eq!(loaded.attempts, 0);
    }

    #[test]
    fn test_pending_is_fifo() {
        let queue = create_test_queue();
        let placeholder = EntityId::placeholder();

        let mut add = PendingChange::new(ChangeOp::CreateItem {
            placeholder,
            list_id: EntityId::Remote(1),
            item: NewItem::named("Milk"),
        });
        queue.enqueue(&mut add).unwrap();

        let mut update = PendingChange::new(ChangeOp::UpdateItem {
            item_id: placeholder,
            patch: ItemPatch::checked(true),
        });
        queue.enqueue(&mut update).unwrap();

        let pending = queue.pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].op.name(), "create_item");
        assert_eq!(pending[1].op.name(), "update_item");
    }

    #[test]
    fn test_record_failure_keeps_change() {
        let queue = create_test_queue();

        let mut change = delete_item(5);
        queue.enqueue(&mut change).unwrap();
        queue
            .record_failure(change.id.unwrap(), "Connection error")
            .unwrap();

        let loaded = queue.get(change.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.attempts, 1);
        assert_eq!(loaded.last_error, Some("Connection error".to_string()));
        assert!(loaded.last_attempt.is_some());
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn test_retarget() {
        let queue = create_test_queue();
        let placeholder = EntityId::placeholder();

        let mut toggle = PendingChange::new(ChangeOp::ToggleItem {
            item_id: placeholder,
            checked: true,
        });
        queue.enqueue(&mut toggle).unwrap();
        let mut other = delete_item(3);
        queue.enqueue(&mut other).unwrap();

        let rewritten = queue
            .retarget(&IdResolution {
                placeholder,
                id: EntityId::Remote(42),
            })
            .unwrap();
        assert_eq!(rewritten, 1);

        let loaded = queue.get(toggle.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.op.target(), EntityId::Remote(42));
    }

    #[test]
    fn test_stats() {
        let queue = create_test_queue();

        let mut first = delete_item(1);
        queue.enqueue(&mut first).unwrap();
        let mut second = delete_item(2);
        queue.enqueue(&mut second).unwrap();
        queue.record_failure(second.id.unwrap(), "HTTP 500").unwrap();

        let stats = queue.stats().unwrap();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.failing, 1);
        assert!(stats.oldest_pending.is_some());
    }

    #[test]
    fn test_remove_and_clear() {
        let queue = create_test_queue();

        let mut change = delete_item(5);
        queue.enqueue(&mut change).unwrap();
        assert!(queue.remove(change.id.unwrap()).unwrap());
        assert!(queue.get(change.id.unwrap()).unwrap().is_none());

        let mut a = delete_item(6);
        queue.enqueue(&mut a).unwrap();
        let mut b = delete_item(7);
        queue.enqueue(&mut b).unwrap();
        assert_eq!(queue.clear().unwrap(), 2);
        assert!(queue.is_empty().unwrap());
    }
}
