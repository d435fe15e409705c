use serde::{Deserialize, Serialize};

use super::EntityId;

/// The two kinds of entity the remote store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    List,
    Item,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Item => "item",
        }
    }

    /// Parse the stored form; unknown values fall back to `Item`.
    #[must_use]
    pub fn from_string(s: &str) -> Self {
        match s {
            "list" => Self::List,
            _ => Self::Item,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub share_code: Option<String>,
}

impl ShoppingList {
    /// Apply the fields set in `patch`.
    pub fn apply(&mut self, patch: &ListPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
    }

    /// Capture the current values of the fields `patch` touches.
    ///
    /// Applying the result restores the list to its state before `patch`.
    #[must_use]
    pub fn capture(&self, patch: &ListPatch) -> ListPatch {
        ListPatch {
            name: patch.name.as_ref().map(|_| self.name.clone()),
            description: patch
                .description
                .as_ref()
                .map(|_| self.description.clone().unwrap_or_default()),
        }
    }

    /// Fields needed to create this list again.
    #[must_use]
    pub fn to_new(&self) -> NewList {
        NewList {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Fields for creating a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewList {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update of a list. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ListPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: EntityId,
    pub list_id: EntityId,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub checked: bool,
}

const fn default_quantity() -> u32 {
    1
}

impl Item {
    /// Build an item from creation fields and the id it was stored under.
    #[must_use]
    pub fn from_new(id: EntityId, list_id: EntityId, new: NewItem) -> Self {
        Self {
            id,
            list_id,
            name: new.name,
            quantity: new.quantity,
            category: new.category,
            notes: new.notes,
            checked: new.checked,
        }
    }

    /// Apply the fields set in `patch`.
    pub fn apply(&mut self, patch: &ItemPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(category) = &patch.category {
            self.category = Some(category.clone());
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(checked) = patch.checked {
            self.checked = checked;
        }
    }

    /// Capture the current values of the fields `patch` touches.
    #[must_use]
    pub fn capture(&self, patch: &ItemPatch) -> ItemPatch {
        ItemPatch {
            name: patch.name.as_ref().map(|_| self.name.clone()),
            quantity: patch.quantity.map(|_| self.quantity),
            category: patch
                .category
                .as_ref()
                .map(|_| self.category.clone().unwrap_or_default()),
            notes: patch
                .notes
                .as_ref()
                .map(|_| self.notes.clone().unwrap_or_default()),
            checked: patch.checked.map(|_| self.checked),
        }
    }

    /// Fields needed to create this item again.
    #[must_use]
    pub fn to_new(&self) -> NewItem {
        NewItem {
            name: self.name.clone(),
            quantity: self.quantity,
            category: self.category.clone(),
            notes: self.notes.clone(),
            checked: self.checked,
        }
    }
}

/// Fields for creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub checked: bool,
}

impl NewItem {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: default_quantity(),
            category: None,
            notes: None,
            checked: false,
        }
    }
}

/// Partial update of an item. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

impl ItemPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.quantity.is_none()
            && self.category.is_none()
            && self.notes.is_none()
            && self.checked.is_none()
    }

    #[must_use]
    pub fn checked(checked: bool) -> Self {
        Self {
            checked: Some(checked),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milk() -> Item {
        Item::from_new(EntityId::Remote(5), EntityId::Remote(1), NewItem::named("Milk"))
    }

    #[test]
    fn test_item_apply_patch() {
        let mut item = milk();
        item.apply(&ItemPatch {
            quantity: Some(3),
            checked: Some(true),
            ..ItemPatch::default()
        });
        assert_eq!(item.quantity, 3);
        assert!(item.checked);
        assert_eq!(item.name, "Milk");
    }

    #[test]
    fn test_item_capture_restores() {
        let original = milk();
        let patch = ItemPatch {
            name: Some("Oat milk".to_string()),
            checked: Some(true),
            ..ItemPatch::default()
        };
        let previous = original.capture(&patch);
        assert_eq!(previous.name.as_deref(), Some("Milk"));
        assert_eq!(previous.checked, Some(false));
        assert!(previous.quantity.is_none());

        let mut item = original.clone();
        item.apply(&patch);
        item.apply(&previous);
        assert_eq!(item, original);
    }

    #[test]
    fn test_patch_serialization_skips_unset() {
        let json = serde_json::to_string(&ItemPatch::checked(false)).unwrap();
        assert_eq!(json, r#"{"checked":false}"#);
    }

    #[test]
    fn test_list_capture() {
        let list = ShoppingList {
            id: EntityId::Remote(1),
            name: "Weekly".to_string(),
            description: None,
            share_code: None,
        };
        let previous = list.capture(&ListPatch {
            name: Some("Party".to_string()),
            description: None,
        });
        assert_eq!(previous.name.as_deref(), Some("Weekly"));
        assert!(previous.description.is_none());
    }

    #[test]
    fn test_new_item_deserialization_minimal() {
        let item: NewItem = serde_json::from_str(r#"{"name": "Bread"}"#).unwrap();
        assert_eq!(item.quantity, 1);
        assert!(!item.checked);
    }
}
