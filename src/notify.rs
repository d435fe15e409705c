//! User-facing notifications for history outcomes.
//!
//! The executor never presents anything itself; hosts plug a [`Notifier`] in
//! here and decide how a notice is shown.

use crate::history::HistoryOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    /// The notice for an outcome, if it deserves one.
    #[must_use]
    pub fn for_outcome(outcome: &HistoryOutcome) -> Option<Self> {
        match outcome {
            HistoryOutcome::Applied {
                description,
                queued,
            } => {
                let (level, message) = if *queued > 0 {
                    (NoticeLevel::Info, format!("{description} (will sync when online)"))
                } else {
                    (NoticeLevel::Success, description.clone())
                };
                Some(Self { level, message })
            },
            HistoryOutcome::Nothing => None,
            HistoryOutcome::Failed { description, error } => Some(Self {
                level: NoticeLevel::Error,
                message: format!("{description} failed: {error}"),
            }),
        }
    }
}

/// Presents notices to the user.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Hand an outcome to a notifier.
pub fn notify_outcome(notifier: &dyn Notifier, outcome: &HistoryOutcome) {
    if let Some(notice) = Notice::for_outcome(outcome) {
        notifier.notify(notice);
    }
}
