//! Offline capability status.
//!
//! Read-side view over the connectivity monitor, the sync engine and the
//! pending-change queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ShopError;
use crate::sync::{DrainOutcome, SyncEngine};

/// Discrete status, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLabel {
    Offline,
    Syncing,
    Error,
    Pending,
    Synced,
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Offline => "offline",
            Self::Syncing => "syncing",
            Self::Error => "error",
            Self::Pending => "pending",
            Self::Synced => "synced",
        };
        write!(f, "{label}")
    }
}

/// Snapshot of synchronization state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub is_online: bool,
    pub syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
    /// Errors left by the most recent drain
    pub errors: Vec<String>,
    pub pending_count: usize,
}

impl SyncStatus {
    #[must_use]
    pub fn label(&self) -> StatusLabel {
        if !self.is_online {
            StatusLabel::Offline
        } else if self.syncing {
            StatusLabel::Syncing
        } else if !self.errors.is_empty() {
            StatusLabel::Error
        } else if self.pending_count > 0 {
            StatusLabel::Pending
        } else {
            StatusLabel::Synced
        }
    }
}

/// Facade over everything the status display needs.
pub struct OfflineStatus {
    engine: Arc<SyncEngine>,
}

impl OfflineStatus {
    #[must_use]
    pub const fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    /// Take a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub fn snapshot(&self) -> Result<SyncStatus, ShopError> {
        Ok(SyncStatus {
            is_online: self.engine.connectivity().is_online(),
            syncing: self.engine.is_syncing(),
            last_sync: self.engine.last_sync()?,
            errors: self.engine.errors()?,
            pending_count: self.engine.queue().len()?,
        })
    }

    /// Drain the queue now.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage fails during the drain.
    pub async fn force_sync(&self) -> Result<DrainOutcome, ShopError> {
        self.engine.drain().await
    }
}
