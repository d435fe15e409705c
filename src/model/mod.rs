//! Shopping-list domain types shared by the local store, the remote store,
//! the action log and the pending-change queue.

mod id;
mod types;

pub use id::EntityId;
pub use types::{EntityKind, Item, ItemPatch, ListPatch, NewItem, NewList, ShoppingList};
