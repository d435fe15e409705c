//! Send-or-queue path for new mutations.
//!
//! A mutation goes straight to the remote store only when nothing could
//! overtake it: the store is reachable, the queue is empty and no drain is
//! running. Otherwise it is applied locally and queued.

use serde::Serialize;
use tracing::{debug, warn};

use super::change::{ChangeOp, IdResolution, PendingChange};
use super::engine::SyncEngine;
use crate::error::ShopError;
use crate::model::EntityId;
use crate::remote;

/// What to do when a direct send fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Queue the change with its error. Used for user edits.
    Enqueue,
    /// Return the error, provided nothing in the batch was applied yet.
    /// Used for undo and redo so the log is only advanced on success.
    Reject,
}

/// Result of submitting a batch of changes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Submission {
    /// Number of changes that went to the queue instead of the remote store
    pub queued: usize,
    /// Placeholders the remote store resolved right away
    pub resolutions: Vec<IdResolution>,
    /// Direct-send failures whose changes were queued
    pub errors: Vec<String>,
}

impl Submission {
    /// Check if everything reached the remote store.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.queued == 0
    }

    /// The id an entity ended up with: its real id if resolved, else itself.
    #[must_use]
    pub fn resolved(&self, id: EntityId) -> EntityId {
        self.resolutions
            .iter()
            .find(|r| r.placeholder == id)
            .map_or(id, |r| r.id)
    }
}

impl SyncEngine {
    fn can_send_directly(&self) -> Result<bool, ShopError> {
        Ok(self.connectivity.is_online() && !self.is_syncing() && self.queue.is_empty()?)
    }

    /// Apply a batch of changes, sending them directly when possible.
    ///
    /// Changes are processed in order. Once one change is queued, every later
    /// change in the batch is queued too.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage fails, or under
    /// [`FailurePolicy::Reject`] if the first direct send fails.
    pub async fn submit(
        &self,
        ops: Vec<ChangeOp>,
        policy: FailurePolicy,
    ) -> Result<Submission, ShopError> {
        let mut submission = Submission::default();
        let mut direct = self.can_send_directly()?;
        let mut applied_any = false;

        for mut op in ops {
            for resolution in &submission.resolutions {
                op.retarget(resolution.placeholder, resolution.id);
            }

            if direct && op.unresolved_reference().is_none() {
                match remote::send(self.remote.as_ref(), &op).await {
                    Ok(confirmation) => {
                        self.local.apply_confirmed(&op, &confirmation)?;
                        if let Some(resolution) = confirmation.resolution(&op) {
                            submission.resolutions.push(resolution);
                        }
                        applied_any = true;
                        continue;
                    },
                    Err(e) => {
                        if e.is_connectivity() {
                            self.connectivity.set_online(false);
                        }
                        if policy == FailurePolicy::Reject && !applied_any {
                            debug!(change = %op.describe(), error = %e, "Direct send rejected");
                            return Err(e);
                        }

                        let message = format!("{}: {e}", op.describe());
                        warn!(error = %message, "Direct send failed, queueing");
                        direct = false;
                        self.local.apply_pending(&op)?;
                        self.queue
                            .enqueue(&mut PendingChange::failed(op, &e.to_string()))?;
                        submission.queued += 1;
                        submission.errors.push(message);
                        applied_any = true;
                        continue;
                    },
                }
            }

            direct = false;
            debug!(change = %op.describe(), "Queueing change");
            self.local.apply_pending(&op)?;
            self.queue.enqueue(&mut PendingChange::new(op))?;
            submission.queued += 1;
            applied_any = true;
        }

        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::{Connectivity, ConnectivityMonitor};
    use crate::model::{Item, ItemPatch, NewItem, NewList, ShoppingList};
    use crate::remote::{MemoryStore, MockRemoteStore, RemoteStore};
    use crate::storage::{Database, LocalStore};
    use crate::sync::{EngineConfig, PendingQueue};
    use std::sync::Arc;

    fn create_test_engine(remote: Arc<dyn RemoteStore>, online: bool) -> SyncEngine {
        let db = Arc::new(Database::open_in_memory().unwrap());
        SyncEngine::new(
            remote,
            Arc::new(PendingQueue::new(Arc::clone(&db))),
            Arc::new(LocalStore::new(db)),
            Arc::new(ConnectivityMonitor::new(Connectivity::from_online(online))),
            EngineConfig::default(),
        )
    }

    fn weekly() -> ShoppingList {
        ShoppingList {
            id: EntityId::Remote(1),
            name: "Weekly".to_string(),
            description: None,
            share_code: None,
        }
    }

    #[tokio::test]
    async fn test_online_sends_directly() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_list(&NewList {
                name: "Weekly".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let engine = create_test_engine(store.clone(), true);
        engine.local().import(&weekly(), &[]).unwrap();

        let placeholder = EntityId::placeholder();
        let submission = engine
            .submit(
                vec![
                    ChangeOp::CreateItem {
                        placeholder,
                        list_id: EntityId::Remote(1),
                        item: NewItem::named("Milk"),
                    },
                    ChangeOp::ToggleItem {
                        item_id: placeholder,
                        checked: true,
                    },
                ],
                FailurePolicy::Enqueue,
            )
            .await
            .unwrap();

        assert!(submission.is_confirmed());
        let real = submission.resolved(placeholder);
        assert_eq!(real, EntityId::Remote(2));
        assert!(engine.queue().is_empty().unwrap());
        assert!(engine.local().item(real).unwrap().unwrap().checked);
        assert!(store.item(2).unwrap().checked);
    }

    #[tokio::test]
    async fn test_offline_applies_locally_and_queues() {
        let store = Arc::new(MemoryStore::new());
        let engine = create_test_engine(store.clone(), false);
        engine.local().import(&weekly(), &[]).unwrap();

        let placeholder = EntityId::placeholder();
        let submission = engine
            .submit(
                vec![ChangeOp::CreateItem {
                    placeholder,
                    list_id: EntityId::Remote(1),
                    item: NewItem::named("Milk"),
                }],
                FailurePolicy::Enqueue,
            )
            .await
            .unwrap();

        assert_eq!(submission.queued, 1);
        assert!(store.calls().is_empty());
        assert_eq!(engine.queue().len().unwrap(), 1);
        assert_eq!(engine.local().item(placeholder).unwrap().unwrap().name, "Milk");
    }

    #[tokio::test]
    async fn test_non_empty_queue_preserves_order() {
        let mut remote = MockRemoteStore::new();
        remote.expect_toggle_item().times(0);
        let engine = create_test_engine(Arc::new(remote), true);
        engine
            .queue()
            .enqueue(&mut PendingChange::new(ChangeOp::DeleteItem {
                item_id: EntityId::Remote(4),
            }))
            .unwrap();

        let submission = engine
            .submit(
                vec![ChangeOp::ToggleItem {
                    item_id: EntityId::Remote(5),
                    checked: true,
                }],
                FailurePolicy::Enqueue,
            )
            .await
            .unwrap();
        assert_eq!(submission.queued, 1);
        assert_eq!(engine.queue().len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_user_edit_is_queued() {
        let mut remote = MockRemoteStore::new();
        remote
            .expect_update_item()
            .times(1)
            .returning(|_, _| Err(ShopError::Remote("HTTP 503: busy".to_string())));
        let engine = create_test_engine(Arc::new(remote), true);
        let milk = Item::from_new(EntityId::Remote(5), EntityId::Remote(1), NewItem::named("Milk"));
        engine.local().import(&weekly(), &[milk]).unwrap();

        let patch = ItemPatch {
            quantity: Some(3),
            ..ItemPatch::default()
        };
        let submission = engine
            .submit(
                vec![ChangeOp::UpdateItem {
                    item_id: EntityId::Remote(5),
                    patch,
                }],
                FailurePolicy::Enqueue,
            )
            .await
            .unwrap();

        assert_eq!(submission.queued, 1);
        assert_eq!(submission.errors.len(), 1);
        let queued = engine.queue().pending().unwrap();
        assert!(queued[0].is_failing());
        assert_eq!(engine.local().item(EntityId::Remote(5)).unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_rejected_history_change_leaves_no_trace() {
        let mut remote = MockRemoteStore::new();
        remote
            .expect_delete_item()
            .times(1)
            .returning(|_| Err(ShopError::Remote("HTTP 500".to_string())));
        let engine = create_test_engine(Arc::new(remote), true);
        let milk = Item::from_new(EntityId::Remote(5), EntityId::Remote(1), NewItem::named("Milk"));
        engine.local().import(&weekly(), &[milk]).unwrap();

        let result = engine
            .submit(
                vec![ChangeOp::DeleteItem {
                    item_id: EntityId::Remote(5),
                }],
                FailurePolicy::Reject,
            )
            .await;

        assert!(result.is_err());
        assert!(engine.queue().is_empty().unwrap());
        assert!(engine.local().item(EntityId::Remote(5)).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_goes_offline() {
        let store = Arc::new(MemoryStore::new());
        store.set_unreachable(true);
        let engine = create_test_engine(store, true);

        let submission = engine
            .submit(
                vec![ChangeOp::DeleteList {
                    list_id: EntityId::Remote(1),
                }],
                FailurePolicy::Enqueue,
            )
            .await
            .unwrap();

        assert_eq!(submission.queued, 1);
        assert!(!engine.connectivity().is_online());
    }
}
