use colored::Colorize;

use crate::history::Action;
use crate::model::{Item, ShoppingList};
use crate::session::HistorySnapshot;
use crate::status::{StatusLabel, SyncStatus};
use crate::sync::{DrainOutcome, PendingChange, QueueStats, Submission};

/// Format lists as a pretty table
#[must_use]
pub fn format_lists_pretty(lists: &[ShoppingList]) -> String {
    if lists.is_empty() {
        return "Lists (0)\n  No lists yet. Create one with 'shoplist list new <name>'".to_string();
    }

    let mut output = format!("Lists ({})\n", lists.len());
    output.push_str(&"─".repeat(40));
    output.push('\n');

    for list in lists {
        let mut line = format!("{}  {}", list.name.bold(), id_label(&list.id.to_string()));
        if let Some(description) = &list.description {
            line.push_str(&format!("  {}", description.dimmed()));
        }
        if let Some(code) = &list.share_code {
            line.push_str(&format!("  {}", format!("shared:{code}").cyan()));
        }
        output.push_str(&line);
        output.push('\n');
    }

    output
}

/// Format a list and its items
#[must_use]
pub fn format_list_pretty(list: &ShoppingList, items: &[Item]) -> String {
    let checked = items.iter().filter(|item| item.checked).count();
    let mut output = format!(
        "{} ({checked}/{} checked)\n",
        list.name.bold(),
        items.len()
    );
    if let Some(description) = &list.description {
        output.push_str(&format!("  {}\n", description.dimmed()));
    }
    output.push_str(&"─".repeat(40));
    output.push('\n');

    if items.is_empty() {
        output.push_str("  No items\n");
        return output;
    }

    for item in items {
        output.push_str(&format_item_line(item));
        output.push('\n');
    }

    output
}

fn format_item_line(item: &Item) -> String {
    let (icon, name) = if item.checked {
        ("[x]".green(), item.name.strikethrough().to_string())
    } else {
        ("[ ]".white(), item.name.bold().to_string())
    };

    let mut line = format!("{icon} {name}");
    if item.quantity > 1 {
        line.push_str(&format!(" x{}", item.quantity).yellow().to_string());
    }
    if let Some(category) = &item.category {
        line.push_str(&format!("  {}", format!("#{category}").cyan()));
    }
    if let Some(notes) = &item.notes {
        line.push_str(&format!("  {}", notes.dimmed()));
    }
    line.push_str(&format!("  {}", id_label(&item.id.to_string())));
    line
}

fn id_label(id: &str) -> String {
    format!("({id})").dimmed().to_string()
}

/// Format the result of an edit
#[must_use]
pub fn format_edit_pretty(message: &str, submission: &Submission) -> String {
    let mut output = if submission.is_confirmed() {
        format!("{} {message}", "✓".green())
    } else {
        format!(
            "{} {message} {}",
            "✓".yellow(),
            "(queued, will sync when online)".dimmed()
        )
    };

    for error in &submission.errors {
        output.push_str(&format!("\n  {} {error}", "!".red()));
    }
    output
}

/// Format the action log, newest first
#[must_use]
pub fn format_history_pretty(history: &HistorySnapshot) -> String {
    let total = history.past.len() + usize::from(history.present.is_some()) + history.future.len();
    if total == 0 {
        return "History (0)\n  Nothing to undo".to_string();
    }

    let mut output = format!("History ({total})\n");
    output.push_str(&"─".repeat(40));
    output.push('\n');

    for action in history.future.iter().rev() {
        output.push_str(&format!("  {}\n", format_action(action).dimmed()));
    }
    if let Some(present) = &history.present {
        output.push_str(&format!("{} {}\n", "▸".green(), format_action(present).bold()));
    }
    for action in history.past.iter().rev() {
        output.push_str(&format!("  {}\n", format_action(action)));
    }

    output
}

fn format_action(action: &Action) -> String {
    format!(
        "{}  {}  {}",
        action.timestamp.format("%Y-%m-%d %H:%M"),
        action.description,
        format!("[{}]", action.kind().display_name())
    )
}

fn colored_label(label: StatusLabel) -> String {
    let text = label.to_string();
    match label {
        StatusLabel::Synced => text.green().to_string(),
        StatusLabel::Pending | StatusLabel::Syncing => text.yellow().to_string(),
        StatusLabel::Error => text.red().to_string(),
        StatusLabel::Offline => text.dimmed().to_string(),
    }
}

/// Format the synchronization status
#[must_use]
pub fn format_status_pretty(status: &SyncStatus, stats: &QueueStats) -> String {
    let mut lines = Vec::new();

    lines.push("Sync Status".bold().to_string());
    lines.push("─".repeat(40));
    lines.push(format!("  Status:     {}", colored_label(status.label())));
    lines.push(format!(
        "  Backend:    {}",
        if status.is_online { "online" } else { "offline" }
    ));
    lines.push(format!(
        "  Pending:    {} {}",
        stats.pending,
        if stats.pending > 0 {
            "changes waiting".dimmed()
        } else {
            "".dimmed()
        }
    ));
    if stats.failing > 0 {
        lines.push(format!(
            "  Failing:    {} {}",
            stats.failing.to_string().red(),
            "changes".dimmed()
        ));
    }
    if let Some(oldest) = stats.oldest_pending {
        lines.push(format!(
            "  Oldest:     {}",
            oldest.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    lines.push(format!(
        "  Last sync:  {}",
        status.last_sync.map_or_else(
            || "never".dimmed().to_string(),
            |t| t.format("%Y-%m-%d %H:%M:%S").to_string()
        )
    ));

    if !status.errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors".red().bold().to_string());
        for error in &status.errors {
            lines.push(format!("  {error}"));
        }
    }

    lines.join("\n")
}

/// Format queued changes
#[must_use]
pub fn format_queue_pretty(changes: &[PendingChange], total: usize) -> String {
    if changes.is_empty() {
        return "No queued changes".to_string();
    }

    let mut lines = Vec::new();
    lines.push(format!("Queued Changes ({} of {total})", changes.len()).bold().to_string());
    lines.push("─".repeat(60));

    for change in changes {
        let icon = if change.is_failing() {
            "✗".red()
        } else {
            "○".yellow()
        };
        lines.push(format!(
            "{icon} {} {}",
            change.op.display_name(),
            change.op.describe().dimmed()
        ));
        lines.push(format!(
            "    {} {}",
            "Queued:".dimmed(),
            change.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
        if change.attempts > 0 {
            lines.push(format!("    {} {}", "Attempts:".dimmed(), change.attempts));
        }
        if let Some(error) = &change.last_error {
            lines.push(format!("    {} {}", "Error:".dimmed(), error.red()));
        }
    }

    lines.join("\n")
}

/// Format the outcome of a drain
#[must_use]
pub fn format_drain_pretty(outcome: &DrainOutcome) -> String {
    let report = match outcome {
        DrainOutcome::Offline => {
            return format!("{} Backend unreachable, nothing sent", "!".yellow());
        },
        DrainOutcome::AlreadySyncing => return "Sync already in progress".to_string(),
        DrainOutcome::Completed(report) => report,
    };

    if report.total() == 0 && !report.interrupted {
        return format!("{} Nothing to sync", "✓".green());
    }

    let mut lines = Vec::new();
    lines.push("Sync Results".bold().to_string());
    lines.push("─".repeat(40));
    lines.push(format!("  Sent:       {}", report.succeeded.to_string().green()));
    if report.failed > 0 {
        lines.push(format!("  Failed:     {}", report.failed.to_string().red()));
    }
    if report.skipped > 0 {
        lines.push(format!(
            "  Held back:  {} {}",
            report.skipped,
            "behind a failed change".dimmed()
        ));
    }
    if report.interrupted {
        lines.push(format!("  {}", "Connection lost, remaining changes stay queued".yellow()));
    }
    for error in &report.errors {
        lines.push(format!("  {} {error}", "✗".red()));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;
    use crate::sync::{ChangeOp, DrainReport};

    fn make_item(name: &str, checked: bool) -> Item {
        Item {
            id: EntityId::Remote(2),
            list_id: EntityId::Remote(1),
            name: name.to_string(),
            quantity: 3,
            category: Some("Dairy".to_string()),
            notes: None,
            checked,
        }
    }

    fn make_list() -> ShoppingList {
        ShoppingList {
            id: EntityId::Remote(1),
            name: "Weekly".to_string(),
            description: Some("Saturday run".to_string()),
            share_code: None,
        }
    }

    #[test]
    fn test_format_lists_empty() {
        let result = format_lists_pretty(&[]);
        assert!(result.contains("Lists (0)"));
        assert!(result.contains("No lists yet"));
    }

    #[test]
    fn test_format_list_with_items() {
        colored::control::set_override(false);
        let items = vec![make_item("Milk", true), make_item("Eggs", false)];
        let result = format_list_pretty(&make_list(), &items);

        assert!(result.contains("Weekly (1/2 checked)"));
        assert!(result.contains("Saturday run"));
        assert!(result.contains("[x] Milk"));
        assert!(result.contains("[ ] Eggs"));
        assert!(result.contains("x3"));
        assert!(result.contains("#Dairy"));
    }

    #[test]
    fn test_format_edit_queued() {
        colored::control::set_override(false);
        let submission = Submission {
            queued: 1,
            errors: vec!["Remote store error: HTTP 500".to_string()],
            ..Submission::default()
        };
        let result = format_edit_pretty("Added Milk", &submission);

        assert!(result.contains("Added Milk"));
        assert!(result.contains("queued"));
        assert!(result.contains("HTTP 500"));
    }

    #[test]
    fn test_format_history_empty() {
        let history = HistorySnapshot {
            past: Vec::new(),
            present: None,
            future: Vec::new(),
        };
        assert!(format_history_pretty(&history).contains("Nothing to undo"));
    }

    #[test]
    fn test_format_status_offline() {
        colored::control::set_override(false);
        let status = SyncStatus {
            is_online: false,
            syncing: false,
            last_sync: None,
            errors: Vec::new(),
            pending_count: 2,
        };
        let stats = QueueStats {
            pending: 2,
            failing: 0,
            oldest_pending: None,
        };
        let result = format_status_pretty(&status, &stats);

        assert!(result.contains("Status:     offline"));
        assert!(result.contains("Pending:    2"));
        assert!(result.contains("never"));
    }

    #[test]
    fn test_format_queue_shows_errors() {
        colored::control::set_override(false);
        let change = PendingChange::failed(
            ChangeOp::DeleteItem {
                item_id: EntityId::Remote(4),
            },
            "HTTP 404",
        );
        let result = format_queue_pretty(&[change], 1);

        assert!(result.contains("Delete Item"));
        assert!(result.contains("Attempts: 1"));
        assert!(result.contains("HTTP 404"));
    }

    #[test]
    fn test_format_drain() {
        assert!(format_drain_pretty(&DrainOutcome::Offline).contains("unreachable"));
        assert!(
            format_drain_pretty(&DrainOutcome::Completed(DrainReport::default()))
                .contains("Nothing to sync")
        );

        colored::control::set_override(false);
        let report = DrainReport {
            succeeded: 2,
            failed: 1,
            errors: vec!["Remote store error: HTTP 500".to_string()],
            ..DrainReport::default()
        };
        let result = format_drain_pretty(&DrainOutcome::Completed(report));
        assert!(result.contains("Sent:       2"));
        assert!(result.contains("Failed:     1"));
        assert!(result.contains("HTTP 500"));
    }
}
