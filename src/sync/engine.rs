//! Sync engine for draining the pending-change queue.
//!
//! Replays queued changes against the remote store in FIFO order, resolving
//! placeholder ids as creations are confirmed.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::change::IdResolution;
use super::queue::PendingQueue;
use crate::connectivity::ConnectivityMonitor;
use crate::error::ShopError;
use crate::history::{self, ActionLog};
use crate::model::EntityId;
use crate::remote::{self, RemoteStore};
use crate::storage::LocalStore;

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Skip later changes that touch an entity whose earlier change failed
    pub strict_entity_order: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_entity_order: true,
        }
    }
}

/// Result of one drain pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainReport {
    /// Number of changes confirmed and removed from the queue
    pub succeeded: usize,
    /// Number of changes the remote store failed
    pub failed: usize,
    /// Number of changes held back to preserve ordering
    pub skipped: usize,
    /// One entry per failed change, in queue order
    pub errors: Vec<String>,
    /// Placeholders resolved during the pass
    pub resolutions: Vec<IdResolution>,
    /// The pass stopped early because the remote store became unreachable
    pub interrupted: bool,
}

impl DrainReport {
    /// Check if every attempted change succeeded.
    #[must_use]
    pub const fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Get total changes looked at.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// What a call to [`SyncEngine::drain`] did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "report", rename_all = "snake_case")]
pub enum DrainOutcome {
    /// The remote store is not reachable; nothing was attempted.
    Offline,
    /// Another drain is running; nothing was attempted.
    AlreadySyncing,
    Completed(DrainReport),
}

impl DrainOutcome {
    /// The report, if a drain actually ran.
    #[must_use]
    pub const fn report(&self) -> Option<&DrainReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Offline | Self::AlreadySyncing => None,
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    last_sync: Option<DateTime<Utc>>,
    errors: Vec<String>,
}

/// Clears the syncing flag when a drain ends, including on early return.
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Replays pending changes against the remote store.
pub struct SyncEngine {
    pub(super) remote: Arc<dyn RemoteStore>,
    pub(super) queue: Arc<PendingQueue>,
    pub(super) local: Arc<LocalStore>,
    pub(super) connectivity: Arc<ConnectivityMonitor>,
    history: Option<Arc<Mutex<ActionLog>>>,
    state: Mutex<EngineState>,
    syncing: AtomicBool,
    config: EngineConfig,
}

impl SyncEngine {
    /// Create an engine.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        queue: Arc<PendingQueue>,
        local: Arc<LocalStore>,
        connectivity: Arc<ConnectivityMonitor>,
        config: EngineConfig,
    ) -> Self {
        Self {
            remote,
            queue,
            local,
            connectivity,
            history: None,
            state: Mutex::new(EngineState::default()),
            syncing: AtomicBool::new(false),
            config,
        }
    }

    /// Rebind this action log whenever a placeholder resolves.
    #[must_use]
    pub fn with_history(mut self, history: Arc<Mutex<ActionLog>>) -> Self {
        self.history = Some(history);
        self
    }

    #[must_use]
    pub fn remote(&self) -> &dyn RemoteStore {
        self.remote.as_ref()
    }

    #[must_use]
    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    #[must_use]
    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    #[must_use]
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Check if a drain is in progress.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// When a drain last finished without failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>, ShopError> {
        Ok(self.state()?.last_sync)
    }

    /// Errors left by the most recent drain.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn errors(&self) -> Result<Vec<String>, ShopError> {
        Ok(self.state()?.errors.clone())
    }

    fn state(&self) -> Result<MutexGuard<'_, EngineState>, ShopError> {
        self.state
            .lock()
            .map_err(|_| ShopError::Poisoned("sync engine state".to_string()))
    }

    /// Send every pending change to the remote store, oldest first.
    ///
    /// A change that fails stays queued with its error recorded; later,
    /// independent changes are still attempted. Returns without doing
    /// anything when offline or when another drain is running.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage fails. Remote failures are reported
    /// in the [`DrainReport`], not as errors.
    pub async fn drain(&self) -> Result<DrainOutcome, ShopError> {
        if !self.connectivity.is_online() {
            debug!("Offline, not draining");
            return Ok(DrainOutcome::Offline);
        }
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Drain already in progress");
            return Ok(DrainOutcome::AlreadySyncing);
        }
        let _guard = SyncingGuard(&self.syncing);

        let report = self.process_queue().await?;

        {
            let mut state = self.state()?;
            state.errors.clone_from(&report.errors);
            if report.all_succeeded() && !report.interrupted {
                state.last_sync = Some(Utc::now());
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Drain finished"
        );
        Ok(DrainOutcome::Completed(report))
    }

    async fn process_queue(&self) -> Result<DrainReport, ShopError> {
        let pending = self.queue.pending()?;
        let mut report = DrainReport::default();
        let mut blocked: HashSet<EntityId> = HashSet::new();

        for mut change in pending {
            let Some(row_id) = change.id else {
                continue;
            };
            for resolution in &report.resolutions {
                change.op.retarget(resolution.placeholder, resolution.id);
            }

            if self.config.strict_entity_order
                && change.op.references().iter().any(|id| blocked.contains(id))
            {
                debug!(change = %change.op.describe(), "Held back behind a failed change");
                blocked.insert(change.op.target());
                report.skipped += 1;
                continue;
            }

            if let Some(missing) = change.op.unresolved_reference() {
                debug!(change = %change.op.describe(), %missing, "Waiting for placeholder");
                report.skipped += 1;
                continue;
            }

            match remote::send(self.remote.as_ref(), &change.op).await {
                Ok(confirmation) => {
                    self.queue.remove(row_id)?;
                    if let Some(resolution) = confirmation.resolution(&change.op) {
                        self.resolve(&resolution)?;
                        report.resolutions.push(resolution);
                    }
                    report.succeeded += 1;
                },
                Err(e) => {
                    let message = format!("{}: {e}", change.op.describe());
                    warn!(error = %message, "Pending change failed");
                    self.queue.record_failure(row_id, &e.to_string())?;
                    report.failed += 1;
                    report.errors.push(message);
                    blocked.insert(change.op.target());

                    if e.is_connectivity() {
                        self.connectivity.set_online(false);
                        report.interrupted = true;
                        break;
                    }
                },
            }
        }

        Ok(report)
    }

    /// Point the queue, the local store and the action log at a real id.
    pub(super) fn resolve(&self, resolution: &IdResolution) -> Result<(), ShopError> {
        debug!(placeholder = %resolution.placeholder, id = %resolution.id, "Placeholder resolved");
        self.queue.retarget(resolution)?;
        self.local.rebind(resolution)?;
        if let Some(log) = &self.history {
            history::lock(log)?.rebind(resolution.placeholder, resolution.id);
        }
        Ok(())
    }
}
