//! Offline change queue and synchronization.
//!
//! Every mutation that cannot reach the remote store right away is stored
//! in the pending-change queue and replayed by the [`SyncEngine`] once the
//! store is reachable again.
//!
//! Features:
//! - Durable FIFO queue in `SQLite`
//! - Placeholder ids for entities created offline, resolved on confirmation
//! - Strict per-entity ordering when a change fails
//! - Single-flight drain guard

mod change;
mod dispatch;
mod engine;
mod queue;

pub use change::{ChangeOp, IdResolution, PendingChange};
pub use dispatch::{FailurePolicy, Submission};
pub use engine::{DrainOutcome, DrainReport, EngineConfig, SyncEngine};
pub use queue::{PendingQueue, QueueStats};
