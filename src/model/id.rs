//! Entity identifiers.
//!
//! Lists and items carry either the id the backend assigned or a locally
//! generated placeholder when they were created while offline. The textual
//! form is `42` for backend ids and `local:<uuid>` for placeholders.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ShopError;

const PLACEHOLDER_PREFIX: &str = "local:";

/// Identifier of a list or an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityId {
    /// Id assigned by the remote store.
    Remote(i64),
    /// Id generated locally for an entity the remote store has not seen yet.
    Placeholder(Uuid),
}

impl EntityId {
    /// Generate a fresh placeholder.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::Placeholder(Uuid::new_v4())
    }

    /// Check if this id still awaits resolution by the remote store.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// The backend id, if assigned.
    #[must_use]
    pub const fn remote(&self) -> Option<i64> {
        match self {
            Self::Remote(id) => Some(*id),
            Self::Placeholder(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(id) => write!(f, "{id}"),
            Self::Placeholder(uuid) => write!(f, "{PLACEHOLDER_PREFIX}{uuid}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix(PLACEHOLDER_PREFIX) {
            return Uuid::parse_str(rest)
                .map(Self::Placeholder)
                .map_err(|e| ShopError::InvalidInput(format!("Invalid placeholder id '{s}': {e}")));
        }
        s.parse::<i64>()
            .map(Self::Remote)
            .map_err(|_| ShopError::InvalidInput(format!("Invalid id '{s}'")))
    }
}

impl TryFrom<String> for EntityId {
    type Error = ShopError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self::Remote(id)
    }
}
