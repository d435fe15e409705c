//! Undo/redo executor.
//!
//! Computes the changes that reverse (or replay) an action, pushes them
//! through the sync engine and only then moves the log.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::action::Plan;
use super::log::ActionLog;
use crate::sync::{FailurePolicy, Submission, SyncEngine};

/// Result of an undo or redo attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HistoryOutcome {
    /// The changes were sent (or queued) and the log moved.
    Applied { description: String, queued: usize },
    /// There was nothing to undo or redo.
    Nothing,
    /// The remote store refused; the log did not move.
    Failed { description: String, error: String },
}

impl HistoryOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    const fn verb(self) -> &'static str {
        match self {
            Self::Undo => "Undo",
            Self::Redo => "Redo",
        }
    }
}

/// Runs undo and redo against the remote store.
pub struct HistoryExecutor {
    log: Arc<Mutex<ActionLog>>,
    engine: Arc<SyncEngine>,
}

impl HistoryExecutor {
    #[must_use]
    pub const fn new(log: Arc<Mutex<ActionLog>>, engine: Arc<SyncEngine>) -> Self {
        Self { log, engine }
    }

    /// Reverse the present action.
    pub async fn execute_undo(&self) -> HistoryOutcome {
        self.execute(Direction::Undo).await
    }

    /// Re-apply the next undone action.
    pub async fn execute_redo(&self) -> HistoryOutcome {
        self.execute(Direction::Redo).await
    }

    async fn execute(&self, direction: Direction) -> HistoryOutcome {
        let (action_id, plan, description) = match self.prepare(direction) {
            Ok(Some(prepared)) => prepared,
            Ok(None) => return HistoryOutcome::Nothing,
            Err(error) => {
                return HistoryOutcome::Failed {
                    description: direction.verb().to_string(),
                    error,
                }
            },
        };

        let submission = match self
            .engine
            .submit(plan.ops.clone(), FailurePolicy::Reject)
            .await
        {
            Ok(submission) => submission,
            Err(e) => {
                warn!(%description, error = %e, "History step failed");
                return HistoryOutcome::Failed {
                    description,
                    error: e.to_string(),
                };
            },
        };

        if let Err(error) = self.advance(direction, action_id, &plan, &submission) {
            return HistoryOutcome::Failed { description, error };
        }

        info!(%description, queued = submission.queued, "History step applied");
        HistoryOutcome::Applied {
            description,
            queued: submission.queued,
        }
    }

    fn prepare(&self, direction: Direction) -> Result<Option<(Uuid, Plan, String)>, String> {
        let log = super::lock(&self.log).map_err(|e| e.to_string())?;
        let action = match direction {
            Direction::Undo => log.present(),
            Direction::Redo => log.next_redo(),
        };
        Ok(action.map(|action| {
            let plan = match direction {
                Direction::Undo => action.payload.undo_plan(),
                Direction::Redo => action.payload.redo_plan(),
            };
            let description = format!("{}: {}", direction.verb(), action.description);
            (action.id, plan, description)
        }))
    }

    fn advance(
        &self,
        direction: Direction,
        action_id: Uuid,
        plan: &Plan,
        submission: &Submission,
    ) -> Result<(), String> {
        let mut log = super::lock(&self.log).map_err(|e| e.to_string())?;

        let current = match direction {
            Direction::Undo => log.present(),
            Direction::Redo => log.next_redo(),
        };
        if current.map(|action| action.id) == Some(action_id) {
            match direction {
                Direction::Undo => log.undo(),
                Direction::Redo => log.redo(),
            }
        }

        // Two passes so a new id that equals some other old id is not rebound twice
        for (old, placeholder) in &plan.recreated {
            log.rebind(*old, *placeholder);
        }
        for (_, placeholder) in &plan.recreated {
            let resolved = submission.resolved(*placeholder);
            if resolved != *placeholder {
                log.rebind(*placeholder, resolved);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::{Connectivity, ConnectivityMonitor};
    use crate::error::ShopError;
    use crate::history::ActionPayload;
    use crate::model::{EntityId, Item, ItemPatch, NewItem, NewList, ShoppingList};
    use crate::remote::{MemoryStore, MockRemoteStore, RemoteStore};
    use crate::storage::{Database, LocalStore};
    use crate::sync::{EngineConfig, PendingQueue};
    use mockall::predicate::eq;

    fn create_test_executor(
        remote: Arc<dyn RemoteStore>,
        online: bool,
    ) -> (HistoryExecutor, Arc<Mutex<ActionLog>>, Arc<SyncEngine>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let log = Arc::new(Mutex::new(ActionLog::default()));
        let engine = Arc::new(
            SyncEngine::new(
                remote,
                Arc::new(PendingQueue::new(Arc::clone(&db))),
                Arc::new(LocalStore::new(db)),
                Arc::new(ConnectivityMonitor::new(Connectivity::from_online(online))),
                EngineConfig::default(),
            )
            .with_history(Arc::clone(&log)),
        );
        let executor = HistoryExecutor::new(Arc::clone(&log), Arc::clone(&engine));
        (executor, log, engine)
    }

    fn check_milk() -> ActionPayload {
        ActionPayload::UpdateItem {
            list_id: EntityId::Remote(1),
            item_id: EntityId::Remote(5),
            previous: ItemPatch::checked(false),
            next: ItemPatch::checked(true),
        }
    }

    #[tokio::test]
    async fn test_undo_update_item() {
        let mut remote = MockRemoteStore::new();
        remote
            .expect_update_item()
            .with(eq(5), eq(ItemPatch::checked(false)))
            .times(1)
            .returning(|_, _| Ok(()));
        let (executor, log, _) = create_test_executor(Arc::new(remote), true);
        let id = log.lock().unwrap().record(check_milk(), "Check Milk").id;

        let outcome = executor.execute_undo().await;
        assert!(outcome.is_applied());

        let log = log.lock().unwrap();
        assert!(log.present().is_none());
        assert_eq!(log.next_redo().unwrap().id, id);
    }

    #[tokio::test]
    async fn test_failed_undo_keeps_log() {
        let mut remote = MockRemoteStore::new();
        remote
            .expect_update_item()
            .times(1)
            .returning(|_, _| Err(ShopError::Remote("HTTP 500".to_string())));
        let (executor, log, engine) = create_test_executor(Arc::new(remote), true);
        let id = log.lock().unwrap().record(check_milk(), "Check Milk").id;

        let outcome = executor.execute_undo().await;
        assert!(matches!(outcome, HistoryOutcome::Failed { .. }));
        assert_eq!(log.lock().unwrap().present().unwrap().id, id);
        assert!(engine.queue().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_nothing_to_do() {
        let (executor, _, _) = create_test_executor(Arc::new(MockRemoteStore::new()), true);
        assert_eq!(executor.execute_undo().await, HistoryOutcome::Nothing);
        assert_eq!(executor.execute_redo().await, HistoryOutcome::Nothing);
    }

    #[tokio::test]
    async fn test_offline_undo_is_queued() {
        let (executor, log, engine) =
            create_test_executor(Arc::new(MockRemoteStore::new()), false);
        log.lock().unwrap().record(check_milk(), "Check Milk");

        let outcome = executor.execute_undo().await;
        assert_eq!(
            outcome,
            HistoryOutcome::Applied {
                description: "Undo: Check Milk".to_string(),
                queued: 1,
            }
        );
        assert_eq!(engine.queue().len().unwrap(), 1);
        assert!(log.lock().unwrap().can_redo());
    }

    #[tokio::test]
    async fn test_undo_delete_then_redo_uses_new_id() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_list(&NewList {
                name: "Weekly".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let (executor, log, _) = create_test_executor(store.clone(), true);

        // Item 5 was deleted earlier; the store has never seen it
        let milk = Item::from_new(EntityId::Remote(5), EntityId::Remote(1), NewItem::named("Milk"));
        log.lock().unwrap().record(
            ActionPayload::DeleteItem {
                list_id: EntityId::Remote(1),
                item: milk,
            },
            "Delete Milk",
        );

        assert!(executor.execute_undo().await.is_applied());
        let restored = store.items(1);
        assert_eq!(restored.len(), 1);
        let new_id = restored[0].id;

        assert!(executor.execute_redo().await.is_applied());
        assert_eq!(
            store.calls().last().unwrap(),
            &format!("delete_item({new_id})")
        );
        assert!(store.items(1).is_empty());
    }

    #[tokio::test]
    async fn test_undo_delete_list_restores_items() {
        let store = Arc::new(MemoryStore::new());
        let (executor, log, engine) = create_test_executor(store.clone(), true);

        let list = ShoppingList {
            id: EntityId::Remote(40),
            name: "Party".to_string(),
            description: Some("Saturday".to_string()),
            share_code: None,
        };
        let items = vec![
            Item::from_new(EntityId::Remote(41), EntityId::Remote(40), NewItem::named("Chips")),
            Item::from_new(EntityId::Remote(42), EntityId::Remote(40), NewItem::named("Soda")),
        ];
        log.lock()
            .unwrap()
            .record(ActionPayload::DeleteList { list, items }, "Delete list Party");

        assert!(executor.execute_undo().await.is_applied());

        let lists = engine.local().lists().unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].name, "Party");
        let restored_id = lists[0].id;
        assert!(!restored_id.is_placeholder());
        assert_eq!(engine.local().items(restored_id).unwrap().len(), 2);

        // The log now refers to the restored list
        let log = log.lock().unwrap();
        let ActionPayload::DeleteList { list, items } = &log.next_redo().unwrap().payload else {
            panic!("expected DeleteList");
        };
        assert_eq!(list.id, restored_id);
        assert!(items.iter().all(|item| item.list_id == restored_id));
    }
}
