//! Sync queue command implementation.
//!
//! Handles sync queue management commands.

use crate::cli::args::{OutputFormat, SyncCommands};
use crate::error::ShopError;
use crate::output::{format_drain, format_queue, format_status, to_json};
use crate::session::ShoppingSession;

/// Execute sync subcommands.
///
/// # Errors
///
/// Returns an error if the queue cannot be read or written.
pub async fn sync(
    session: &ShoppingSession,
    cmd: SyncCommands,
    format: OutputFormat,
) -> Result<String, ShopError> {
    match cmd {
        SyncCommands::Status => status(session, format),
        SyncCommands::Run => {
            let outcome = session.force_sync().await?;
            format_drain(&outcome, format)
        },
        SyncCommands::Queue { limit } => {
            let changes = session.pending_changes()?;
            let total = changes.len();
            let shown: Vec<_> = changes.into_iter().take(limit).collect();
            format_queue(&shown, total, format)
        },
        SyncCommands::Clear { force } => clear_queue(session, force, format),
    }
}

/// Show connectivity and queue status.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub fn status(session: &ShoppingSession, format: OutputFormat) -> Result<String, ShopError> {
    let status = session.status()?;
    let stats = session.queue_stats()?;
    format_status(&status, &stats, format)
}

fn clear_queue(
    session: &ShoppingSession,
    force: bool,
    format: OutputFormat,
) -> Result<String, ShopError> {
    if !force {
        return Err(ShopError::InvalidInput(
            "Use --force to drop every queued change".to_string(),
        ));
    }
    let count = session.clear_queue()?;

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({"cleared": count})),
        OutputFormat::Pretty => Ok(format!("Dropped {count} queued changes")),
    }
}
