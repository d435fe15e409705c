//! Change types for the pending-change queue.
//!
//! A `ChangeOp` is one remote-store call waiting to happen. A `PendingChange`
//! wraps it with the bookkeeping the queue persists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{EntityId, EntityKind, ItemPatch, ListPatch, NewItem, NewList};

/// A mutation to send to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChangeOp {
    /// Create a list; `placeholder` is the id it carries locally until confirmed.
    CreateList { placeholder: EntityId, list: NewList },
    UpdateList { list_id: EntityId, patch: ListPatch },
    DeleteList { list_id: EntityId },
    /// Create an item; `placeholder` is the id it carries locally until confirmed.
    CreateItem {
        placeholder: EntityId,
        list_id: EntityId,
        item: NewItem,
    },
    UpdateItem { item_id: EntityId, patch: ItemPatch },
    ToggleItem { item_id: EntityId, checked: bool },
    DeleteItem { item_id: EntityId },
}

impl ChangeOp {
    /// Stable name used in storage.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateList { .. } => "create_list",
            Self::UpdateList { .. } => "update_list",
            Self::DeleteList { .. } => "delete_list",
            Self::CreateItem { .. } => "create_item",
            Self::UpdateItem { .. } => "update_item",
            Self::ToggleItem { .. } => "toggle_item",
            Self::DeleteItem { .. } => "delete_item",
        }
    }

    /// Get the display name for this operation.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::CreateList { .. } => "Create List",
            Self::UpdateList { .. } => "Update List",
            Self::DeleteList { .. } => "Delete List",
            Self::CreateItem { .. } => "Create Item",
            Self::UpdateItem { .. } => "Update Item",
            Self::ToggleItem { .. } => "Toggle Item",
            Self::DeleteItem { .. } => "Delete Item",
        }
    }

    /// The kind of entity this change targets.
    #[must_use]
    pub const fn entity(&self) -> EntityKind {
        match self {
            Self::CreateList { .. } | Self::UpdateList { .. } | Self::DeleteList { .. } => {
                EntityKind::List
            },
            Self::CreateItem { .. }
            | Self::UpdateItem { .. }
            | Self::ToggleItem { .. }
            | Self::DeleteItem { .. } => EntityKind::Item,
        }
    }

    /// The entity this change targets. For creations this is the placeholder.
    #[must_use]
    pub const fn target(&self) -> EntityId {
        match self {
            Self::CreateList { placeholder, .. } | Self::CreateItem { placeholder, .. } => {
                *placeholder
            },
            Self::UpdateList { list_id, .. } | Self::DeleteList { list_id } => *list_id,
            Self::UpdateItem { item_id, .. }
            | Self::ToggleItem { item_id, .. }
            | Self::DeleteItem { item_id } => *item_id,
        }
    }

    /// Every entity whose ordering this change participates in.
    #[must_use]
    pub fn references(&self) -> Vec<EntityId> {
        match self {
            Self::CreateItem {
                placeholder,
                list_id,
                ..
            } => vec![*placeholder, *list_id],
            _ => vec![self.target()],
        }
    }

    /// The placeholder this change turns into a real id, if it is a creation.
    #[must_use]
    pub const fn creates(&self) -> Option<EntityId> {
        match self {
            Self::CreateList { placeholder, .. } | Self::CreateItem { placeholder, .. } => {
                Some(*placeholder)
            },
            _ => None,
        }
    }

    /// A placeholder this change needs resolved before it can be sent.
    #[must_use]
    pub fn unresolved_reference(&self) -> Option<EntityId> {
        let created = self.creates();
        self.references()
            .into_iter()
            .find(|id| id.is_placeholder() && Some(*id) != created)
    }

    /// Replace every reference to `from` with `to`.
    pub fn retarget(&mut self, from: EntityId, to: EntityId) {
        let swap = |id: &mut EntityId| {
            if *id == from {
                *id = to;
            }
        };
        match self {
            Self::CreateList { placeholder, .. } => swap(placeholder),
            Self::CreateItem {
                placeholder,
                list_id,
                ..
            } => {
                swap(placeholder);
                swap(list_id);
            },
            Self::UpdateList { list_id, .. } | Self::DeleteList { list_id } => swap(list_id),
            Self::UpdateItem { item_id, .. }
            | Self::ToggleItem { item_id, .. }
            | Self::DeleteItem { item_id } => swap(item_id),
        }
    }

    /// One-line summary for error messages and listings.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CreateList { list, .. } => format!("create list '{}'", list.name),
            Self::UpdateList { list_id, .. } => format!("update list {list_id}"),
            Self::DeleteList { list_id } => format!("delete list {list_id}"),
            Self::CreateItem { item, list_id, .. } => {
                format!("add '{}' to list {list_id}", item.name)
            },
            Self::UpdateItem { item_id, .. } => format!("update item {item_id}"),
            Self::ToggleItem { item_id, checked } => {
                let verb = if *checked { "check" } else { "uncheck" };
                format!("{verb} item {item_id}")
            },
            Self::DeleteItem { item_id } => format!("delete item {item_id}"),
        }
    }
}

impl std::fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A placeholder that the remote store has assigned a real id to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdResolution {
    pub placeholder: EntityId,
    pub id: EntityId,
}

/// A queued change with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChange {
    /// Queue row id; also the FIFO order key
    pub id: Option<i64>,
    /// Durable identifier of the change
    pub change_id: Uuid,
    /// The remote-store call
    pub op: ChangeOp,
    /// When the change was queued
    pub created_at: DateTime<Utc>,
    /// Number of failed send attempts
    pub attempts: i32,
    /// Last attempt timestamp
    pub last_attempt: Option<DateTime<Utc>>,
    /// Last error message
    pub last_error: Option<String>,
}

impl PendingChange {
    /// Create a new, never attempted change.
    #[must_use]
    pub fn new(op: ChangeOp) -> Self {
        Self {
            id: None,
            change_id: Uuid::new_v4(),
            op,
            created_at: Utc::now(),
            attempts: 0,
            last_attempt: None,
            last_error: None,
        }
    }

    /// Create a change that already failed once when sent directly.
    #[must_use]
    pub fn failed(op: ChangeOp, error: &str) -> Self {
        let mut change = Self::new(op);
        change.attempts = 1;
        change.last_attempt = Some(change.created_at);
        change.last_error = Some(error.to_string());
        change
    }

    /// Check if the last attempt to send this change failed.
    #[must_use]
    pub const fn is_failing(&self) -> bool {
        self.last_error.is_some()
    }
}
