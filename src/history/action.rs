//! Recorded user actions.
//!
//! Each payload variant carries the snapshot its inverse needs, so undo and
//! redo never have to ask the remote store what an entity looked like.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{EntityId, Item, ItemPatch, ListPatch, ShoppingList};
use crate::sync::ChangeOp;

/// Kinds of undoable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AddItem,
    DeleteItem,
    UpdateItem,
    ToggleItem,
    DeleteList,
    UpdateList,
}

impl ActionKind {
    /// Get the display name for this kind.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::AddItem => "Add Item",
            Self::DeleteItem => "Delete Item",
            Self::UpdateItem => "Update Item",
            Self::ToggleItem => "Toggle Item",
            Self::DeleteList => "Delete List",
            Self::UpdateList => "Update List",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Kind-specific snapshot data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    /// `item` is the created item as stored.
    AddItem { list_id: EntityId, item: Item },
    /// `item` is the item as it was just before deletion.
    DeleteItem { list_id: EntityId, item: Item },
    /// `previous` holds the old values of exactly the fields `next` sets.
    UpdateItem {
        list_id: EntityId,
        item_id: EntityId,
        previous: ItemPatch,
        next: ItemPatch,
    },
    ToggleItem {
        list_id: EntityId,
        item_id: EntityId,
        previous: bool,
        next: bool,
    },
    /// The list and every item it held when it was deleted.
    DeleteList { list: ShoppingList, items: Vec<Item> },
    UpdateList {
        list_id: EntityId,
        previous: ListPatch,
        next: ListPatch,
    },
}

/// Changes that realize one direction of an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub ops: Vec<ChangeOp>,
    /// `(snapshot id, placeholder)` for every entity the plan re-creates.
    pub recreated: Vec<(EntityId, EntityId)>,
}

impl Plan {
    fn single(op: ChangeOp) -> Self {
        Self {
            ops: vec![op],
            recreated: Vec::new(),
        }
    }

    fn recreate_item(list_id: EntityId, item: &Item) -> Self {
        let placeholder = EntityId::placeholder();
        Self {
            ops: vec![ChangeOp::CreateItem {
                placeholder,
                list_id,
                item: item.to_new(),
            }],
            recreated: vec![(item.id, placeholder)],
        }
    }

    fn restore_list(list: &ShoppingList, items: &[Item]) -> Self {
        let list_placeholder = EntityId::placeholder();
        let mut plan = Self {
            ops: vec![ChangeOp::CreateList {
                placeholder: list_placeholder,
                list: list.to_new(),
            }],
            recreated: vec![(list.id, list_placeholder)],
        };

        for item in items {
            let placeholder = EntityId::placeholder();
            plan.ops.push(ChangeOp::CreateItem {
                placeholder,
                list_id: list_placeholder,
                item: item.to_new(),
            });
            plan.recreated.push((item.id, placeholder));
        }

        plan
    }
}

impl ActionPayload {
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::AddItem { .. } => ActionKind::AddItem,
            Self::DeleteItem { .. } => ActionKind::DeleteItem,
            Self::UpdateItem { .. } => ActionKind::UpdateItem,
            Self::ToggleItem { .. } => ActionKind::ToggleItem,
            Self::DeleteList { .. } => ActionKind::DeleteList,
            Self::UpdateList { .. } => ActionKind::UpdateList,
        }
    }

    /// The list this action belongs to.
    #[must_use]
    pub const fn list_id(&self) -> EntityId {
        match self {
            Self::AddItem { list_id, .. }
            | Self::DeleteItem { list_id, .. }
            | Self::UpdateItem { list_id, .. }
            | Self::ToggleItem { list_id, .. }
            | Self::UpdateList { list_id, .. } => *list_id,
            Self::DeleteList { list, .. } => list.id,
        }
    }

    /// Changes that reverse this action.
    #[must_use]
    pub fn undo_plan(&self) -> Plan {
        match self {
            Self::AddItem { item, .. } => Plan::single(ChangeOp::DeleteItem { item_id: item.id }),
            Self::DeleteItem { list_id, item } => Plan::recreate_item(*list_id, item),
            Self::UpdateItem {
                item_id, previous, ..
            } => Plan::single(ChangeOp::UpdateItem {
                item_id: *item_id,
                patch: previous.clone(),
            }),
            Self::ToggleItem {
                item_id, previous, ..
            } => Plan::single(ChangeOp::ToggleItem {
                item_id: *item_id,
                checked: *previous,
            }),
            Self::DeleteList { list, items } => Plan::restore_list(list, items),
            Self::UpdateList {
                list_id, previous, ..
            } => Plan::single(ChangeOp::UpdateList {
                list_id: *list_id,
                patch: previous.clone(),
            }),
        }
    }

    /// Changes that perform this action again.
    #[must_use]
    pub fn redo_plan(&self) -> Plan {
        match self {
            Self::AddItem { list_id, item } => Plan::recreate_item(*list_id, item),
            Self::DeleteItem { item, .. } => Plan::single(ChangeOp::DeleteItem { item_id: item.id }),
            Self::UpdateItem { item_id, next, .. } => Plan::single(ChangeOp::UpdateItem {
                item_id: *item_id,
                patch: next.clone(),
            }),
            Self::ToggleItem { item_id, next, .. } => Plan::single(ChangeOp::ToggleItem {
                item_id: *item_id,
                checked: *next,
            }),
            Self::DeleteList { list, .. } => Plan::single(ChangeOp::DeleteList { list_id: list.id }),
            Self::UpdateList { list_id, next, .. } => Plan::single(ChangeOp::UpdateList {
                list_id: *list_id,
                patch: next.clone(),
            }),
        }
    }

    /// Replace every reference to `from` with `to`.
    pub fn rebind(&mut self, from: EntityId, to: EntityId) {
        let swap = |id: &mut EntityId| {
            if *id == from {
                *id = to;
            }
        };
        match self {
            Self::AddItem { list_id, item } | Self::DeleteItem { list_id, item } => {
                swap(list_id);
                swap(&mut item.id);
                swap(&mut item.list_id);
            },
            Self::UpdateItem {
                list_id, item_id, ..
            }
            | Self::ToggleItem {
                list_id, item_id, ..
            } => {
                swap(list_id);
                swap(item_id);
            },
            Self::DeleteList { list, items } => {
                swap(&mut list.id);
                for item in items {
                    swap(&mut item.id);
                    swap(&mut item.list_id);
                }
            },
            Self::UpdateList { list_id, .. } => swap(list_id),
        }
    }
}

/// One recorded user mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    /// Position in the session; strictly increasing.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub payload: ActionPayload,
}

impl Action {
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewItem;

    fn item(id: i64, name: &str) -> Item {
        Item::from_new(EntityId::Remote(id), EntityId::Remote(1), NewItem::named(name))
    }

    #[test]
    fn test_add_item_plans() {
        let payload = ActionPayload::AddItem {
            list_id: EntityId::Remote(1),
            item: item(5, "Milk"),
        };
        assert_eq!(payload.kind(), ActionKind::AddItem);

        let undo = payload.undo_plan();
        assert_eq!(
            undo.ops,
            vec![ChangeOp::DeleteItem {
                item_id: EntityId::Remote(5)
            }]
        );

        let redo = payload.redo_plan();
        assert_eq!(redo.ops.len(), 1);
        assert_eq!(redo.recreated.len(), 1);
        assert_eq!(redo.recreated[0].0, EntityId::Remote(5));
        assert!(redo.recreated[0].1.is_placeholder());
    }

    #[test]
    fn test_update_item_plans() {
        let payload = ActionPayload::UpdateItem {
            list_id: EntityId::Remote(1),
            item_id: EntityId::Remote(5),
            previous: ItemPatch::checked(false),
            next: ItemPatch::checked(true),
        };
        assert_eq!(
            payload.undo_plan().ops,
            vec![ChangeOp::UpdateItem {
                item_id: EntityId::Remote(5),
                patch: ItemPatch::checked(false),
            }]
        );
        assert_eq!(
            payload.redo_plan().ops,
            vec![ChangeOp::UpdateItem {
                item_id: EntityId::Remote(5),
                patch: ItemPatch::checked(true),
            }]
        );
    }

    #[test]
    fn test_delete_list_restores_items_under_new_list() {
        let list = ShoppingList {
            id: EntityId::Remote(1),
            name: "Weekly".to_string(),
            description: None,
            share_code: None,
        };
        let payload = ActionPayload::DeleteList {
            list,
            items: vec![item(5, "Milk"), item(6, "Eggs")],
        };

        let plan = payload.undo_plan();
        assert_eq!(plan.ops.len(), 3);
        let list_placeholder = plan.ops[0].creates().unwrap();
        for op in &plan.ops[1..] {
            assert!(matches!(op, ChangeOp::CreateItem { list_id, .. } if *list_id == list_placeholder));
        }
        assert_eq!(plan.recreated.len(), 3);
        assert_eq!(plan.recreated[0], (EntityId::Remote(1), list_placeholder));

        assert_eq!(
            payload.redo_plan().ops,
            vec![ChangeOp::DeleteList {
                list_id: EntityId::Remote(1)
            }]
        );
    }

    #[test]
    fn test_rebind() {
        let mut payload = ActionPayload::DeleteItem {
            list_id: EntityId::Remote(1),
            item: item(5, "Milk"),
        };
        payload.rebind(EntityId::Remote(5), EntityId::Remote(50));
        payload.rebind(EntityId::Remote(1), EntityId::Remote(10));

        let ActionPayload::DeleteItem { list_id, item } = payload else {
            panic!("kind changed");
        };
        assert_eq!(list_id, EntityId::Remote(10));
        assert_eq!(item.id, EntityId::Remote(50));
        assert_eq!(item.list_id, EntityId::Remote(10));
    }
}
