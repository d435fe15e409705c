//! Undo, redo and history commands.

use std::cell::RefCell;

use colored::Colorize;

use crate::cli::args::OutputFormat;
use crate::error::ShopError;
use crate::history::HistoryOutcome;
use crate::notify::{notify_outcome, Notice, NoticeLevel, Notifier};
use crate::output::{format_history, to_json};
use crate::session::ShoppingSession;

/// Collects notices as colored terminal lines.
#[derive(Default)]
pub struct ConsoleNotifier {
    lines: RefCell<Vec<String>>,
}

impl ConsoleNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything notified so far, one notice per line.
    #[must_use]
    pub fn into_output(self) -> String {
        self.lines.into_inner().join("\n")
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let icon = match notice.level {
            NoticeLevel::Success => "✓".green(),
            NoticeLevel::Info => "✓".yellow(),
            NoticeLevel::Error => "✗".red(),
        };
        self.lines
            .borrow_mut()
            .push(format!("{icon} {}", notice.message));
    }
}

fn present(outcome: &HistoryOutcome, empty: &str, format: OutputFormat) -> Result<String, ShopError> {
    match format {
        OutputFormat::Json => to_json(outcome),
        OutputFormat::Pretty => {
            if matches!(outcome, HistoryOutcome::Nothing) {
                return Ok(empty.to_string());
            }
            let notifier = ConsoleNotifier::new();
            notify_outcome(&notifier, outcome);
            Ok(notifier.into_output())
        },
    }
}

/// Undo the present action.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub async fn undo(session: &ShoppingSession, format: OutputFormat) -> Result<String, ShopError> {
    let outcome = session.execute_undo().await;
    present(&outcome, "Nothing to undo", format)
}

/// Redo the next undone action.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub async fn redo(session: &ShoppingSession, format: OutputFormat) -> Result<String, ShopError> {
    let outcome = session.execute_redo().await;
    present(&outcome, "Nothing to redo", format)
}

/// Show or clear the action log.
///
/// # Errors
///
/// Returns an error if the action log is unavailable.
pub fn history(
    session: &ShoppingSession,
    clear: bool,
    format: OutputFormat,
) -> Result<String, ShopError> {
    if clear {
        session.clear_history()?;
        return match format {
            OutputFormat::Json => to_json(&serde_json::json!({"cleared": true})),
            OutputFormat::Pretty => Ok("Cleared undo history".to_string()),
        };
    }
    format_history(&session.history()?, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_notifier_collects_lines() {
        colored::control::set_override(false);
        let notifier = ConsoleNotifier::new();
        notify_outcome(
            &notifier,
            &HistoryOutcome::Applied {
                description: "Undo: Add Milk".to_string(),
                queued: 0,
            },
        );
        notify_outcome(
            &notifier,
            &HistoryOutcome::Failed {
                description: "Redo: Add Milk".to_string(),
                error: "HTTP 500".to_string(),
            },
        );

        let output = notifier.into_output();
        assert_eq!(
            output,
            "✓ Undo: Add Milk\n✗ Redo: Add Milk failed: HTTP 500"
        );
    }

    #[test]
    fn test_nothing_to_undo() {
        let output = present(&HistoryOutcome::Nothing, "Nothing to undo", OutputFormat::Pretty).unwrap();
        assert_eq!(output, "Nothing to undo");

        let json = present(&HistoryOutcome::Nothing, "Nothing to undo", OutputFormat::Json).unwrap();
        assert!(json.contains("\"outcome\": \"nothing\""));
    }
}
