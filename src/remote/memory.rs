//! In-process remote store.
//!
//! Holds lists and items in memory and journals every call it receives,
//! which makes it useful for embedding the core without a backend and for
//! asserting on the exact sequence of remote calls.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{RemoteStore, SharedList};
use crate::error::ShopError;
use crate::model::{EntityId, Item, ItemPatch, ListPatch, NewItem, NewList, ShoppingList};

#[derive(Default)]
struct Inner {
    next_id: i64,
    lists: BTreeMap<i64, ShoppingList>,
    items: BTreeMap<i64, Item>,
    calls: Vec<String>,
    rejected_names: HashSet<String>,
    unreachable: bool,
}

impl Inner {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self) -> Result<(), ShopError> {
        if self.unreachable {
            return Err(ShopError::Unreachable("memory store is unreachable".to_string()));
        }
        Ok(())
    }

    fn check_name(&self, name: &str) -> Result<(), ShopError> {
        if self.rejected_names.contains(name) {
            return Err(ShopError::Remote(format!("'{name}' was rejected")));
        }
        Ok(())
    }
}

/// Remote store kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, ShopError> {
        self.inner
            .lock()
            .map_err(|_| ShopError::Remote("memory store lock poisoned".to_string()))
    }

    /// Every call received so far, e.g. `create_item(1, Milk)`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().map(|inner| inner.calls.clone()).unwrap_or_default()
    }

    /// Fail every create or rename that uses `name`.
    pub fn reject_name(&self, name: &str) {
        if let Ok(mut inner) = self.lock() {
            inner.rejected_names.insert(name.to_string());
        }
    }

    /// Stop rejecting `name`.
    pub fn accept_name(&self, name: &str) {
        if let Ok(mut inner) = self.lock() {
            inner.rejected_names.remove(name);
        }
    }

    /// Simulate losing (or regaining) the connection to the backend.
    pub fn set_unreachable(&self, unreachable: bool) {
        if let Ok(mut inner) = self.lock() {
            inner.unreachable = unreachable;
        }
    }

    /// Snapshot of a stored list.
    #[must_use]
    pub fn list(&self, id: i64) -> Option<ShoppingList> {
        self.lock().ok().and_then(|inner| inner.lists.get(&id).cloned())
    }

    /// Snapshot of a stored item.
    #[must_use]
    pub fn item(&self, id: i64) -> Option<Item> {
        self.lock().ok().and_then(|inner| inner.items.get(&id).cloned())
    }

    /// Items stored for a list, by id.
    #[must_use]
    pub fn items(&self, list_id: i64) -> Vec<Item> {
        self.lock()
            .map(|inner| {
                inner
                    .items
                    .values()
                    .filter(|item| item.list_id == EntityId::Remote(list_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Assign a share code to a stored list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list does not exist.
    pub fn share(&self, list_id: i64, code: &str) -> Result<(), ShopError> {
        let mut inner = self.lock()?;
        let list = inner
            .lists
            .get_mut(&list_id)
            .ok_or_else(|| ShopError::NotFound(format!("list {list_id}")))?;
        list.share_code = Some(code.to_string());
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn create_list(&self, list: &NewList) -> Result<ShoppingList, ShopError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("create_list({})", list.name));
        inner.check()?;
        inner.check_name(&list.name)?;

        let id = inner.allocate();
        let created = ShoppingList {
            id: EntityId::Remote(id),
            name: list.name.clone(),
            description: list.description.clone(),
            share_code: None,
        };
        inner.lists.insert(id, created.clone());
        Ok(created)
    }

    async fn update_list(&self, list_id: i64, patch: &ListPatch) -> Result<(), ShopError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("update_list({list_id})"));
        inner.check()?;
        if let Some(name) = &patch.name {
            inner.check_name(name)?;
        }

        let list = inner
            .lists
            .get_mut(&list_id)
            .ok_or_else(|| ShopError::NotFound(format!("list {list_id}")))?;
        list.apply(patch);
        Ok(())
    }

    async fn delete_list(&self, list_id: i64) -> Result<(), ShopError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("delete_list({list_id})"));
        inner.check()?;

        inner
            .lists
            .remove(&list_id)
            .ok_or_else(|| ShopError::NotFound(format!("list {list_id}")))?;
        inner
            .items
            .retain(|_, item| item.list_id != EntityId::Remote(list_id));
        Ok(())
    }

    async fn create_item(&self, list_id: i64, item: &NewItem) -> Result<Item, ShopError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("create_item({list_id}, {})", item.name));
        inner.check()?;
        inner.check_name(&item.name)?;

        if !inner.lists.contains_key(&list_id) {
            return Err(ShopError::NotFound(format!("list {list_id}")));
        }

        let id = inner.allocate();
        let created = Item::from_new(EntityId::Remote(id), EntityId::Remote(list_id), item.clone());
        inner.items.insert(id, created.clone());
        Ok(created)
    }

    async fn update_item(&self, item_id: i64, patch: &ItemPatch) -> Result<(), ShopError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("update_item({item_id})"));
        inner.check()?;
        if let Some(name) = &patch.name {
            inner.check_name(name)?;
        }

        let item = inner
            .items
            .get_mut(&item_id)
            .ok_or_else(|| ShopError::NotFound(format!("item {item_id}")))?;
        item.apply(patch);
        Ok(())
    }

    async fn toggle_item(&self, item_id: i64, checked: bool) -> Result<(), ShopError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("toggle_item({item_id}, {checked})"));
        inner.check()?;

        let item = inner
            .items
            .get_mut(&item_id)
            .ok_or_else(|| ShopError::NotFound(format!("item {item_id}")))?;
        item.checked = checked;
        Ok(())
    }

    async fn delete_item(&self, item_id: i64) -> Result<(), ShopError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("delete_item({item_id})"));
        inner.check()?;

        inner
            .items
            .remove(&item_id)
            .ok_or_else(|| ShopError::NotFound(format!("item {item_id}")))?;
        Ok(())
    }

    async fn list_by_share_code(&self, code: &str) -> Result<Option<SharedList>, ShopError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("list_by_share_code({code})"));
        inner.check()?;

        let Some(list) = inner
            .lists
            .values()
            .find(|list| list.share_code.as_deref() == Some(code))
            .cloned()
        else {
            return Ok(None);
        };

        let items = inner
            .items
            .values()
            .filter(|item| item.list_id == list.id)
            .cloned()
            .collect();
        Ok(Some(SharedList { list, items }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_update() {
        let store = MemoryStore::new();
        let list = store
            .create_list(&NewList {
                name: "Weekly".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let list_id = list.id.remote().unwrap();

        let item = store
            .create_item(list_id, &NewItem::named("Milk"))
            .await
            .unwrap();
        let item_id = item.id.remote().unwrap();

        store.toggle_item(item_id, true).await.unwrap();
        assert!(store.item(item_id).unwrap().checked);

        assert_eq!(
            store.calls(),
            vec![
                "create_list(Weekly)".to_string(),
                format!("create_item({list_id}, Milk)"),
                format!("toggle_item({item_id}, true)"),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete_item(99).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejected_and_unreachable() {
        let store = MemoryStore::new();
        store.reject_name("Weekly");
        let err = store
            .create_list(&NewList {
                name: "Weekly".to_string(),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Remote(_)));

        store.set_unreachable(true);
        let err = store.delete_list(1).await.unwrap_err();
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn test_share_code_lookup() {
        let store = MemoryStore::new();
        let list = store
            .create_list(&NewList {
                name: "BBQ".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let list_id = list.id.remote().unwrap();
        store
            .create_item(list_id, &NewItem::named("Charcoal"))
            .await
            .unwrap();
        store.share(list_id, "XK42").unwrap();

        let shared = store.list_by_share_code("XK42").await.unwrap().unwrap();
        assert_eq!(shared.list.name, "BBQ");
        assert_eq!(shared.items.len(), 1);
        assert!(store.list_by_share_code("NOPE").await.unwrap().is_none());
    }
}
