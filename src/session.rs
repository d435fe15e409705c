//! Shopping session: one action log, one queue, one monitor.
//!
//! [`ShoppingSession`] wires the offline core together and is the surface
//! hosts talk to. Every edit is applied locally, sent or queued through the
//! sync engine and, once that succeeded, recorded in the action log.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connectivity::{Connectivity, ConnectivityMonitor, Transition};
use crate::error::ShopError;
use crate::history::{self, Action, ActionLog, ActionPayload, HistoryExecutor, HistoryOutcome};
use crate::model::{EntityId, Item, ItemPatch, ListPatch, NewItem, NewList, ShoppingList};
use crate::remote::{RemoteStore, SharedList};
use crate::status::{OfflineStatus, SyncStatus};
use crate::storage::{AppState, Database, LocalStore, HISTORY_KEY, LAST_ONLINE_KEY};
use crate::sync::{
    ChangeOp, DrainOutcome, EngineConfig, FailurePolicy, PendingChange, PendingQueue,
    QueueStats, Submission, SyncEngine,
};

/// Knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub max_history: usize,
    /// Load and save the action log through the database
    pub persist_history: bool,
    pub auto_sync_on_reconnect: bool,
    pub engine: EngineConfig,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_history: history::DEFAULT_MAX_HISTORY,
            persist_history: false,
            auto_sync_on_reconnect: true,
            engine: EngineConfig::default(),
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_history: config.history.max_size,
            persist_history: config.history.persist,
            auto_sync_on_reconnect: config.sync.auto_sync_on_reconnect,
            engine: EngineConfig {
                strict_entity_order: config.sync.strict_entity_order,
            },
        }
    }
}

/// Result of a user edit.
#[derive(Debug, Clone)]
pub struct Edit<T> {
    /// The entity as stored locally afterwards
    pub value: T,
    pub submission: Submission,
}

/// The action log split into its three parts.
#[derive(Debug, Clone, Serialize)]
pub struct HistorySnapshot {
    pub past: Vec<Action>,
    pub present: Option<Action>,
    pub future: Vec<Action>,
}

/// Root composition of the offline core.
pub struct ShoppingSession {
    engine: Arc<SyncEngine>,
    log: Arc<Mutex<ActionLog>>,
    executor: HistoryExecutor,
    status: OfflineStatus,
    state: AppState,
    options: SessionOptions,
}

impl ShoppingSession {
    /// Build a session over an open database.
    ///
    /// With `persist_history` set, the action log saved by a previous
    /// session is restored.
    ///
    /// # Errors
    ///
    /// Returns an error if the saved history cannot be read.
    pub fn new(
        db: Arc<Database>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<ConnectivityMonitor>,
        options: SessionOptions,
    ) -> Result<Self, ShopError> {
        let state = AppState::new(Arc::clone(&db));
        let log = if options.persist_history {
            load_history(&state, options.max_history)?
        } else {
            ActionLog::new(options.max_history)
        };
        let log = Arc::new(Mutex::new(log));

        let engine = Arc::new(
            SyncEngine::new(
                remote,
                Arc::new(PendingQueue::new(Arc::clone(&db))),
                Arc::new(LocalStore::new(db)),
                connectivity,
                options.engine.clone(),
            )
            .with_history(Arc::clone(&log)),
        );

        Ok(Self {
            executor: HistoryExecutor::new(Arc::clone(&log), Arc::clone(&engine)),
            status: OfflineStatus::new(Arc::clone(&engine)),
            engine,
            log,
            state,
            options,
        })
    }

    /// Connectivity recorded when the previous session was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read.
    pub fn last_connectivity(db: &Arc<Database>) -> Result<Option<Connectivity>, ShopError> {
        let value = AppState::new(Arc::clone(db)).get(LAST_ONLINE_KEY)?;
        Ok(value.map(|v| Connectivity::from_online(v == "true")))
    }

    /// Save the action log (if enabled) and the current connectivity.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn persist(&self) -> Result<(), ShopError> {
        if self.options.persist_history {
            let json = serde_json::to_string(&*history::lock(&self.log)?)?;
            self.state.set(HISTORY_KEY, &json)?;
        }
        let online = self.engine.connectivity().is_online();
        self.state.set(LAST_ONLINE_KEY, if online { "true" } else { "false" })
    }

    #[must_use]
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    fn local(&self) -> &LocalStore {
        self.engine.local()
    }

    fn record(&self, payload: ActionPayload, description: String) -> Result<(), ShopError> {
        debug!(%description, "Recording action");
        history::lock(&self.log)?.record(payload, description);
        Ok(())
    }

    // Lists

    /// Create a list. List creation is not undoable.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or local storage fails.
    pub async fn create_list(&self, list: NewList) -> Result<Edit<ShoppingList>, ShopError> {
        if list.name.trim().is_empty() {
            return Err(ShopError::InvalidInput("List name cannot be empty".to_string()));
        }

        let placeholder = EntityId::placeholder();
        let submission = self
            .engine
            .submit(
                vec![ChangeOp::CreateList { placeholder, list }],
                FailurePolicy::Enqueue,
            )
            .await?;

        let id = submission.resolved(placeholder);
        let value = self
            .local()
            .list(id)?
            .ok_or_else(|| ShopError::NotFound(format!("list {id}")))?;
        Ok(Edit { value, submission })
    }

    /// Change a list's name or description.
    ///
    /// # Errors
    ///
    /// Returns an error if the list does not exist, the patch is empty or
    /// local storage fails.
    pub async fn update_list(
        &self,
        list_id: EntityId,
        patch: ListPatch,
    ) -> Result<Edit<ShoppingList>, ShopError> {
        if patch.is_empty() {
            return Err(ShopError::InvalidInput("Nothing to change".to_string()));
        }
        let current = self.require_list(list_id)?;
        let previous = current.capture(&patch);
        let description = match &patch.name {
            Some(name) if *name != current.name => {
                format!("Rename list {} to {name}", current.name)
            },
            _ => format!("Edit list {}", current.name),
        };

        let submission = self
            .engine
            .submit(
                vec![ChangeOp::UpdateList {
                    list_id,
                    patch: patch.clone(),
                }],
                FailurePolicy::Enqueue,
            )
            .await?;
        self.record(
            ActionPayload::UpdateList {
                list_id,
                previous,
                next: patch,
            },
            description,
        )?;

        let value = self.require_list(list_id)?;
        Ok(Edit { value, submission })
    }

    /// Delete a list and its items.
    ///
    /// # Errors
    ///
    /// Returns an error if the list does not exist or local storage fails.
    pub async fn delete_list(&self, list_id: EntityId) -> Result<Edit<ShoppingList>, ShopError> {
        let list = self.require_list(list_id)?;
        let items = self.local().items(list_id)?;

        let submission = self
            .engine
            .submit(vec![ChangeOp::DeleteList { list_id }], FailurePolicy::Enqueue)
            .await?;
        let description = format!("Delete list {}", list.name);
        self.record(
            ActionPayload::DeleteList {
                list: list.clone(),
                items,
            },
            description,
        )?;

        Ok(Edit {
            value: list,
            submission,
        })
    }

    // Items

    /// Add an item to a list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list does not exist, the item is invalid or
    /// local storage fails.
    pub async fn add_item(&self, list_id: EntityId, item: NewItem) -> Result<Edit<Item>, ShopError> {
        if item.name.trim().is_empty() {
            return Err(ShopError::InvalidInput("Item name cannot be empty".to_string()));
        }
        if item.quantity == 0 {
            return Err(ShopError::InvalidInput("Quantity must be at least 1".to_string()));
        }
        self.require_list(list_id)?;

        let placeholder = EntityId::placeholder();
        let submission = self
            .engine
            .submit(
                vec![ChangeOp::CreateItem {
                    placeholder,
                    list_id,
                    item,
                }],
                FailurePolicy::Enqueue,
            )
            .await?;

        let value = self.require_item(submission.resolved(placeholder))?;
        self.record(
            ActionPayload::AddItem {
                list_id,
                item: value.clone(),
            },
            format!("Add {}", value.name),
        )?;
        Ok(Edit { value, submission })
    }

    /// Change fields of an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist, the patch is empty or
    /// local storage fails.
    pub async fn update_item(&self, item_id: EntityId, patch: ItemPatch) -> Result<Edit<Item>, ShopError> {
        if patch.is_empty() {
            return Err(ShopError::InvalidInput("Nothing to change".to_string()));
        }
        if patch.quantity == Some(0) {
            return Err(ShopError::InvalidInput("Quantity must be at least 1".to_string()));
        }
        let current = self.require_item(item_id)?;
        let previous = current.capture(&patch);

        let submission = self
            .engine
            .submit(
                vec![ChangeOp::UpdateItem {
                    item_id,
                    patch: patch.clone(),
                }],
                FailurePolicy::Enqueue,
            )
            .await?;
        self.record(
            ActionPayload::UpdateItem {
                list_id: current.list_id,
                item_id,
                previous,
                next: patch,
            },
            format!("Edit {}", current.name),
        )?;

        let value = self.require_item(item_id)?;
        Ok(Edit { value, submission })
    }

    /// Check or uncheck an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist or local storage fails.
    pub async fn set_checked(&self, item_id: EntityId, checked: bool) -> Result<Edit<Item>, ShopError> {
        let current = self.require_item(item_id)?;

        let submission = self
            .engine
            .submit(
                vec![ChangeOp::ToggleItem { item_id, checked }],
                FailurePolicy::Enqueue,
            )
            .await?;
        let verb = if checked { "Check" } else { "Uncheck" };
        self.record(
            ActionPayload::ToggleItem {
                list_id: current.list_id,
                item_id,
                previous: current.checked,
                next: checked,
            },
            format!("{verb} {}", current.name),
        )?;

        let value = self.require_item(item_id)?;
        Ok(Edit { value, submission })
    }

    /// Flip an item's checked flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist or local storage fails.
    pub async fn toggle(&self, item_id: EntityId) -> Result<Edit<Item>, ShopError> {
        let current = self.require_item(item_id)?;
        self.set_checked(item_id, !current.checked).await
    }

    /// Remove an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist or local storage fails.
    pub async fn delete_item(&self, item_id: EntityId) -> Result<Edit<Item>, ShopError> {
        let item = self.require_item(item_id)?;

        let submission = self
            .engine
            .submit(vec![ChangeOp::DeleteItem { item_id }], FailurePolicy::Enqueue)
            .await?;
        self.record(
            ActionPayload::DeleteItem {
                list_id: item.list_id,
                item: item.clone(),
            },
            format!("Delete {}", item.name),
        )?;

        Ok(Edit {
            value: item,
            submission,
        })
    }

    // Reads

    /// All lists, in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage fails.
    pub fn lists(&self) -> Result<Vec<ShoppingList>, ShopError> {
        self.local().lists()
    }

    /// Items of a list.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage fails.
    pub fn items(&self, list_id: EntityId) -> Result<Vec<Item>, ShopError> {
        self.local().items(list_id)
    }

    fn require_list(&self, id: EntityId) -> Result<ShoppingList, ShopError> {
        self.local()
            .list(id)?
            .ok_or_else(|| ShopError::NotFound(format!("list {id}")))
    }

    fn require_item(&self, id: EntityId) -> Result<Item, ShopError> {
        self.local()
            .item(id)?
            .ok_or_else(|| ShopError::NotFound(format!("item {id}")))
    }

    /// Find a list by id or, failing that, by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if no list matches or local storage fails.
    pub fn find_list(&self, query: &str) -> Result<ShoppingList, ShopError> {
        if let Ok(id) = query.parse::<EntityId>() {
            if let Some(list) = self.local().list(id)? {
                return Ok(list);
            }
        }
        self.lists()?
            .into_iter()
            .find(|list| list.name.eq_ignore_ascii_case(query))
            .ok_or_else(|| ShopError::NotFound(format!("list '{query}'")))
    }

    /// Find an item of a list by id or, failing that, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if no item matches or local storage fails.
    pub fn find_item(&self, list_id: EntityId, query: &str) -> Result<Item, ShopError> {
        let items = self.items(list_id)?;
        if let Ok(id) = query.parse::<EntityId>() {
            if let Some(item) = items.iter().find(|item| item.id == id) {
                return Ok(item.clone());
            }
        }
        items
            .into_iter()
            .find(|item| item.name.eq_ignore_ascii_case(query))
            .ok_or_else(|| ShopError::NotFound(format!("item '{query}'")))
    }

    /// Look a list up by share code and keep a local copy.
    ///
    /// # Errors
    ///
    /// Returns an error if offline or if the remote store fails.
    pub async fn open_shared(&self, code: &str) -> Result<Option<SharedList>, ShopError> {
        if !self.engine.connectivity().is_online() {
            return Err(ShopError::Unreachable(
                "Share codes can only be resolved online".to_string(),
            ));
        }

        let shared = match self.engine.remote().list_by_share_code(code).await {
            Ok(shared) => shared,
            Err(e) => {
                if e.is_connectivity() {
                    self.engine.connectivity().set_online(false);
                }
                return Err(e);
            },
        };
        if let Some(shared) = &shared {
            self.local().import(&shared.list, &shared.items)?;
        }
        Ok(shared)
    }

    // History

    /// Record an action without touching the remote store.
    ///
    /// # Errors
    ///
    /// Returns an error if the action log lock is poisoned.
    pub fn add_action(&self, payload: ActionPayload, description: impl Into<String>) -> Result<(), ShopError> {
        self.record(payload, description.into())
    }

    /// Step the log back without touching the remote store.
    ///
    /// # Errors
    ///
    /// Returns an error if the action log lock is poisoned.
    pub fn undo(&self) -> Result<(), ShopError> {
        history::lock(&self.log)?.undo();
        Ok(())
    }

    /// Step the log forward without touching the remote store.
    ///
    /// # Errors
    ///
    /// Returns an error if the action log lock is poisoned.
    pub fn redo(&self) -> Result<(), ShopError> {
        history::lock(&self.log)?.redo();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the action log lock is poisoned.
    pub fn can_undo(&self) -> Result<bool, ShopError> {
        Ok(history::lock(&self.log)?.can_undo())
    }

    /// # Errors
    ///
    /// Returns an error if the action log lock is poisoned.
    pub fn can_redo(&self) -> Result<bool, ShopError> {
        Ok(history::lock(&self.log)?.can_redo())
    }

    /// # Errors
    ///
    /// Returns an error if the action log lock is poisoned.
    pub fn clear_history(&self) -> Result<(), ShopError> {
        history::lock(&self.log)?.clear();
        Ok(())
    }

    /// Copy of the action log.
    ///
    /// # Errors
    ///
    /// Returns an error if the action log lock is poisoned.
    pub fn history(&self) -> Result<HistorySnapshot, ShopError> {
        let log = history::lock(&self.log)?;
        Ok(HistorySnapshot {
            past: log.past().iter().cloned().collect(),
            present: log.present().cloned(),
            future: log.future().iter().cloned().collect(),
        })
    }

    /// Undo the present action against the remote store.
    pub async fn execute_undo(&self) -> HistoryOutcome {
        self.executor.execute_undo().await
    }

    /// Redo the next undone action against the remote store.
    pub async fn execute_redo(&self) -> HistoryOutcome {
        self.executor.execute_redo().await
    }

    // Sync

    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub fn status(&self) -> Result<SyncStatus, ShopError> {
        self.status.snapshot()
    }

    /// Drain the pending-change queue now.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage fails during the drain.
    pub async fn force_sync(&self) -> Result<DrainOutcome, ShopError> {
        self.status.force_sync().await
    }

    /// Report the platform's connectivity signal.
    ///
    /// Coming back online drains the queue when auto-sync is enabled; the
    /// drain outcome is returned in that case.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage fails during the drain.
    pub async fn set_online(&self, online: bool) -> Result<Option<DrainOutcome>, ShopError> {
        let transition = self.engine.connectivity().set_online(online);
        if transition == Transition::CameOnline && self.options.auto_sync_on_reconnect {
            info!("Back online, draining pending changes");
            return self.engine.drain().await.map(Some);
        }
        Ok(None)
    }

    /// Drain whenever the monitor reports `Offline -> Online`.
    ///
    /// For hosts that feed the [`ConnectivityMonitor`] directly instead of
    /// going through [`ShoppingSession::set_online`].
    #[must_use]
    pub fn watch_connectivity(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        let mut changes = self.engine.connectivity().subscribe();

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let online = changes.borrow_and_update().is_online();
                if !online || !session.options.auto_sync_on_reconnect {
                    continue;
                }
                if let Err(e) = session.engine.drain().await {
                    warn!(error = %e, "Background drain failed");
                }
            }
        })
    }

    /// Queued changes, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub fn pending_changes(&self) -> Result<Vec<PendingChange>, ShopError> {
        self.engine.queue().pending()
    }

    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub fn queue_stats(&self) -> Result<QueueStats, ShopError> {
        self.engine.queue().stats()
    }

    /// Drop every queued change. Local copies keep the dropped edits.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be written.
    pub fn clear_queue(&self) -> Result<usize, ShopError> {
        self.engine.queue().clear()
    }
}

fn load_history(state: &AppState, max_size: usize) -> Result<ActionLog, ShopError> {
    let Some(json) = state.get(HISTORY_KEY)? else {
        return Ok(ActionLog::new(max_size));
    };

    match serde_json::from_str::<ActionLog>(&json) {
        Ok(mut log) => {
            log.set_max_size(max_size);
            Ok(log)
        },
        Err(e) => {
            warn!(error = %e, "Discarding unreadable history");
            Ok(ActionLog::new(max_size))
        },
    }
}
