//! The remote store: the backend that owns the authoritative copy of lists
//! and items.
//!
//! The core only talks to it through [`RemoteStore`]. [`HttpStore`] speaks
//! the backend's JSON API; [`MemoryStore`] keeps everything in process.

mod http;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::error::ShopError;
use crate::model::{EntityId, Item, ItemPatch, ListPatch, NewItem, NewList, ShoppingList};
use crate::sync::{ChangeOp, IdResolution};

/// A list together with its items, as returned by a share-code lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedList {
    pub list: ShoppingList,
    pub items: Vec<Item>,
}

/// CRUD operations on the backend. Ids are backend ids.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create_list(&self, list: &NewList) -> Result<ShoppingList, ShopError>;

    async fn update_list(&self, list_id: i64, patch: &ListPatch) -> Result<(), ShopError>;

    async fn delete_list(&self, list_id: i64) -> Result<(), ShopError>;

    async fn create_item(&self, list_id: i64, item: &NewItem) -> Result<Item, ShopError>;

    async fn update_item(&self, item_id: i64, patch: &ItemPatch) -> Result<(), ShopError>;

    async fn toggle_item(&self, item_id: i64, checked: bool) -> Result<(), ShopError>;

    async fn delete_item(&self, item_id: i64) -> Result<(), ShopError>;

    /// Resolve a list by its share code. `None` if no list has that code.
    async fn list_by_share_code(&self, code: &str) -> Result<Option<SharedList>, ShopError>;
}

/// What the remote store handed back for a successful change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// A list was created.
    List(ShoppingList),
    /// An item was created.
    Item(Item),
    /// An update, toggle or delete went through.
    Done,
}

impl Confirmation {
    /// The placeholder this confirmation resolves, if `op` created something.
    #[must_use]
    pub fn resolution(&self, op: &ChangeOp) -> Option<IdResolution> {
        let placeholder = op.creates()?;
        let id = match self {
            Self::List(list) => list.id,
            Self::Item(item) => item.id,
            Self::Done => return None,
        };
        (placeholder != id).then_some(IdResolution { placeholder, id })
    }
}

fn backend_id(id: EntityId) -> Result<i64, ShopError> {
    id.remote().ok_or_else(|| {
        ShopError::InvalidInput(format!("{id} has not been created on the remote store yet"))
    })
}

/// A delete of something the backend no longer has already took effect.
fn already_deleted(result: Result<(), ShopError>, op: &ChangeOp) -> Result<(), ShopError> {
    match result {
        Err(ShopError::NotFound(what)) => {
            debug!(change = %op.describe(), %what, "Already deleted on the remote store");
            Ok(())
        },
        other => other,
    }
}

/// Issue the remote-store call for one change.
///
/// Deletes are idempotent: a delete the backend answers with not-found is
/// confirmed, so a replayed delete leaves the queue.
///
/// # Errors
///
/// Returns an error if the change references an unresolved placeholder or
/// the remote store fails the call.
pub async fn send(store: &dyn RemoteStore, op: &ChangeOp) -> Result<Confirmation, ShopError> {
    match op {
        ChangeOp::CreateList { list, .. } => store.create_list(list).await.map(Confirmation::List),
        ChangeOp::UpdateList { list_id, patch } => {
            store.update_list(backend_id(*list_id)?, patch).await?;
            Ok(Confirmation::Done)
        },
        ChangeOp::DeleteList { list_id } => {
            already_deleted(store.delete_list(backend_id(*list_id)?).await, op)?;
            Ok(Confirmation::Done)
        },
        ChangeOp::CreateItem { list_id, item, .. } => store
            .create_item(backend_id(*list_id)?, item)
            .await
            .map(Confirmation::Item),
        ChangeOp::UpdateItem { item_id, patch } => {
            store.update_item(backend_id(*item_id)?, patch).await?;
            Ok(Confirmation::Done)
        },
        ChangeOp::ToggleItem { item_id, checked } => {
            store.toggle_item(backend_id(*item_id)?, *checked).await?;
            Ok(Confirmation::Done)
        },
        ChangeOp::DeleteItem { item_id } => {
            already_deleted(store.delete_item(backend_id(*item_id)?).await, op)?;
            Ok(Confirmation::Done)
        },
    }
}
