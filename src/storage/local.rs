//! Local mirror of lists and items.
//!
//! Every mutation lands here first (or right after the remote store confirms
//! it), so the application always reads its own writes, online or not.

use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::Database;
use crate::error::ShopError;
use crate::model::{EntityId, Item, ItemPatch, ListPatch, ShoppingList};
use crate::remote::Confirmation;
use crate::sync::{ChangeOp, IdResolution};

/// Lists and items as the user currently sees them.
pub struct LocalStore {
    db: Arc<Database>,
}

impl LocalStore {
    #[must_use]
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Apply a change that has not reached the remote store yet.
    ///
    /// Created entities are stored under their placeholder ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn apply_pending(&self, op: &ChangeOp) -> Result<(), ShopError> {
        let conn = self.db.connection()?;
        apply_op(&conn, op)
    }

    /// Apply a change the remote store has confirmed.
    ///
    /// Created entities are stored under the id the remote store assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn apply_confirmed(&self, op: &ChangeOp, confirmation: &Confirmation) -> Result<(), ShopError> {
        let conn = self.db.connection()?;
        match confirmation {
            Confirmation::List(list) => write_list(&conn, list),
            Confirmation::Item(item) => write_item(&conn, item),
            Confirmation::Done => apply_op(&conn, op),
        }
    }

    /// Replace a placeholder id with the id the remote store assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn rebind(&self, resolution: &IdResolution) -> Result<(), ShopError> {
        let conn = self.db.connection()?;
        let from = resolution.placeholder.to_string();
        let to = resolution.id.to_string();

        conn.execute("UPDATE lists SET id = ?1 WHERE id = ?2", params![to, from])?;
        conn.execute("UPDATE items SET id = ?1 WHERE id = ?2", params![to, from])?;
        conn.execute(
            "UPDATE items SET list_id = ?1 WHERE list_id = ?2",
            params![to, from],
        )?;
        Ok(())
    }

    /// Store a list and its items as received from the remote store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn import(&self, list: &ShoppingList, items: &[Item]) -> Result<(), ShopError> {
        let conn = self.db.connection()?;
        write_list(&conn, list)?;
        for item in items {
            write_item(&conn, item)?;
        }
        Ok(())
    }

    /// Get all lists, in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn lists(&self) -> Result<Vec<ShoppingList>, ShopError> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, share_code FROM lists ORDER BY name COLLATE NOCASE",
        )?;
        let rows = stmt.query_map([], row_to_list)?;

        let mut lists = Vec::new();
        for row in rows {
            lists.push(row?);
        }
        Ok(lists)
    }

    /// Get a list by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list(&self, id: EntityId) -> Result<Option<ShoppingList>, ShopError> {
        let conn = self.db.connection()?;
        let list = conn
            .query_row(
                "SELECT id, name, description, share_code FROM lists WHERE id = ?1",
                [id.to_string()],
                row_to_list,
            )
            .optional()?;
        Ok(list)
    }

    /// Get the items of a list, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn items(&self, list_id: EntityId) -> Result<Vec<Item>, ShopError> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            r"SELECT id, list_id, name, quantity, category, notes, checked
              FROM items WHERE list_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map([list_id.to_string()], row_to_item)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Get an item by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn item(&self, id: EntityId) -> Result<Option<Item>, ShopError> {
        let conn = self.db.connection()?;
        let item = conn
            .query_row(
                r"SELECT id, list_id, name, quantity, category, notes, checked
                  FROM items WHERE id = ?1",
                [id.to_string()],
                row_to_item,
            )
            .optional()?;
        Ok(item)
    }
}

fn apply_op(conn: &Connection, op: &ChangeOp) -> Result<(), ShopError> {
    match op {
        ChangeOp::CreateList { placeholder, list } => write_list(
            conn,
            &ShoppingList {
                id: *placeholder,
                name: list.name.clone(),
                description: list.description.clone(),
                share_code: None,
            },
        ),
        ChangeOp::UpdateList { list_id, patch } => patch_list(conn, *list_id, patch),
        ChangeOp::DeleteList { list_id } => {
            conn.execute("DELETE FROM items WHERE list_id = ?1", [list_id.to_string()])?;
            conn.execute("DELETE FROM lists WHERE id = ?1", [list_id.to_string()])?;
            Ok(())
        },
        ChangeOp::CreateItem {
            placeholder,
            list_id,
            item,
        } => write_item(conn, &Item::from_new(*placeholder, *list_id, item.clone())),
        ChangeOp::UpdateItem { item_id, patch } => patch_item(conn, *item_id, patch),
        ChangeOp::ToggleItem { item_id, checked } => {
            patch_item(conn, *item_id, &ItemPatch::checked(*checked))
        },
        ChangeOp::DeleteItem { item_id } => {
            conn.execute("DELETE FROM items WHERE id = ?1", [item_id.to_string()])?;
            Ok(())
        },
    }
}

fn write_list(conn: &Connection, list: &ShoppingList) -> Result<(), ShopError> {
    conn.execute(
        r"INSERT INTO lists (id, name, description, share_code) VALUES (?1, ?2, ?3, ?4)
          ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            share_code = excluded.share_code",
        params![
            list.id.to_string(),
            list.name,
            list.description,
            list.share_code
        ],
    )?;
    Ok(())
}

fn write_item(conn: &Connection, item: &Item) -> Result<(), ShopError> {
    conn.execute(
        r"INSERT INTO items (id, list_id, name, quantity, category, notes, checked)
          VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
          ON CONFLICT(id) DO UPDATE SET
            list_id = excluded.list_id,
            name = excluded.name,
            quantity = excluded.quantity,
            category = excluded.category,
            notes = excluded.notes,
            checked = excluded.checked",
        params![
            item.id.to_string(),
            item.list_id.to_string(),
            item.name,
            item.quantity,
            item.category,
            item.notes,
            item.checked
        ],
    )?;
    Ok(())
}

fn patch_list(conn: &Connection, id: EntityId, patch: &ListPatch) -> Result<(), ShopError> {
    let current = conn
        .query_row(
            "SELECT id, name, description, share_code FROM lists WHERE id = ?1",
            [id.to_string()],
            row_to_list,
        )
        .optional()?;

    match current {
        Some(mut list) => {
            list.apply(patch);
            write_list(conn, &list)
        },
        None => {
            debug!(list = %id, "Patched list is not stored locally");
            Ok(())
        },
    }
}

fn patch_item(conn: &Connection, id: EntityId, patch: &ItemPatch) -> Result<(), ShopError> {
    let current = conn
        .query_row(
            r"SELECT id, list_id, name, quantity, category, notes, checked
              FROM items WHERE id = ?1",
            [id.to_string()],
            row_to_item,
        )
        .optional()?;

    match current {
        Some(mut item) => {
            item.apply(patch);
            write_item(conn, &item)
        },
        None => {
            debug!(item = %id, "Patched item is not stored locally");
            Ok(())
        },
    }
}

fn parse_id(idx: usize, value: &str) -> Result<EntityId, rusqlite::Error> {
    value.parse().map_err(|e: ShopError| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_list(row: &Row<'_>) -> Result<ShoppingList, rusqlite::Error> {
    let id: String = row.get(0)?;
    Ok(ShoppingList {
        id: parse_id(0, &id)?,
        name: row.get(1)?,
        description: row.get(2)?,
        share_code: row.get(3)?,
    })
}

fn row_to_item(row: &Row<'_>) -> Result<Item, rusqlite::Error> {
    let id: String = row.get(0)?;
    let list_id: String = row.get(1)?;
    Ok(Item {
        id: parse_id(0, &id)?,
        list_id: parse_id(1, &list_id)?,
        name: row.get(2)?,
        quantity: row.get(3)?,
        category: row.get(4)?,
        notes: row.get(5)?,
        checked: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewItem, NewList};

    fn create_test_store() -> LocalStore {
        LocalStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn test_pending_create_uses_placeholders() {
        let store = create_test_store();
        let list_id = EntityId::placeholder();
        let item_id = EntityId::placeholder();

        store
            .apply_pending(&ChangeOp::CreateList {
                placeholder: list_id,
                list: NewList {
                    name: "Weekly".to_string(),
                    description: None,
                },
            })
            .unwrap();
        store
            .apply_pending(&ChangeOp::CreateItem {
                placeholder: item_id,
                list_id,
                item: NewItem::named("Milk"),
            })
            .unwrap();

        let items = store.items(list_id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, item_id);
        assert_eq!(store.list(list_id).unwrap().unwrap().name, "Weekly");
    }

    #[test]
    fn test_rebind_moves_items() {
        let store = create_test_store();
        let list_id = EntityId::placeholder();
        let item_id = EntityId::placeholder();
        store
            .apply_pending(&ChangeOp::CreateList {
                placeholder: list_id,
                list: NewList {
                    name: "Party".to_string(),
                    description: None,
                },
            })
            .unwrap();
        store
            .apply_pending(&ChangeOp::CreateItem {
                placeholder: item_id,
                list_id,
                item: NewItem::named("Chips"),
            })
            .unwrap();

        store
            .rebind(&IdResolution {
                placeholder: list_id,
                id: EntityId::Remote(10),
            })
            .unwrap();

        assert!(store.list(list_id).unwrap().is_none());
        let items = store.items(EntityId::Remote(10)).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].list_id, EntityId::Remote(10));
    }

    #[test]
    fn test_toggle_and_delete() {
        let store = create_test_store();
        let item = Item::from_new(EntityId::Remote(5), EntityId::Remote(1), NewItem::named("Eggs"));
        store.import(
            &ShoppingList {
                id: EntityId::Remote(1),
                name: "Weekly".to_string(),
                description: None,
                share_code: Some("ABC123".to_string()),
            },
            &[item],
        )
        .unwrap();

        store
            .apply_pending(&ChangeOp::ToggleItem {
                item_id: EntityId::Remote(5),
                checked: true,
            })
            .unwrap();
        assert!(store.item(EntityId::Remote(5)).unwrap().unwrap().checked);

        store
            .apply_pending(&ChangeOp::DeleteList {
                list_id: EntityId::Remote(1),
            })
            .unwrap();
        assert!(store.item(EntityId::Remote(5)).unwrap().is_none());
        assert!(store.lists().unwrap().is_empty());
    }

    #[test]
    fn test_confirmed_create_uses_remote_id() {
        let store = create_test_store();
        let placeholder = EntityId::placeholder();
        let op = ChangeOp::CreateItem {
            placeholder,
            list_id: EntityId::Remote(1),
            item: NewItem::named("Bread"),
        };
        let confirmed = Item::from_new(EntityId::Remote(77), EntityId::Remote(1), NewItem::named("Bread"));

        store
            .apply_confirmed(&op, &Confirmation::Item(confirmed))
            .unwrap();

        assert!(store.item(placeholder).unwrap().is_none());
        assert_eq!(store.item(EntityId::Remote(77)).unwrap().unwrap().name, "Bread");
    }
}
