//! The action log: past, present and future.

use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::{Action, ActionPayload};
use crate::model::EntityId;

/// Default number of actions retained.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Undo/redo history.
///
/// `present` is the action the next undo reverses; `future[0]` is the action
/// the next redo re-applies. The log only does bookkeeping and never talks
/// to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLog {
    past: VecDeque<Action>,
    present: Option<Action>,
    future: VecDeque<Action>,
    max_size: usize,
    next_sequence: u64,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl ActionLog {
    /// Create an empty log retaining at most `max_size` actions (at least one).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: None,
            future: VecDeque::new(),
            max_size: max_size.max(1),
            next_sequence: 0,
        }
    }

    /// Record a new action as the present one.
    ///
    /// The previous present moves to the past, redo history is discarded and
    /// the oldest past entries are dropped to stay within the size limit.
    pub fn record(&mut self, payload: ActionPayload, description: impl Into<String>) -> &Action {
        self.next_sequence += 1;
        let action = Action {
            id: Uuid::new_v4(),
            sequence: self.next_sequence,
            timestamp: Utc::now(),
            description: description.into(),
            payload,
        };

        if let Some(previous) = self.present.take() {
            self.past.push_back(previous);
        }
        self.future.clear();
        while self.past.len() + 1 > self.max_size {
            self.past.pop_front();
        }

        self.present.insert(action)
    }

    /// Step back one action. No-op if nothing is present.
    pub fn undo(&mut self) {
        let Some(current) = self.present.take() else {
            return;
        };
        self.future.push_front(current);
        self.present = self.past.pop_back();
    }

    /// Step forward one action. No-op if there is nothing to redo.
    pub fn redo(&mut self) {
        let Some(next) = self.future.pop_front() else {
            return;
        };
        if let Some(current) = self.present.replace(next) {
            self.past.push_back(current);
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.past.clear();
        self.present = None;
        self.future.clear();
    }

    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.present.is_some()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// The action the next undo reverses.
    #[must_use]
    pub const fn present(&self) -> Option<&Action> {
        self.present.as_ref()
    }

    /// The action the next redo re-applies.
    #[must_use]
    pub fn next_redo(&self) -> Option<&Action> {
        self.future.front()
    }

    /// Older actions, oldest first.
    #[must_use]
    pub const fn past(&self) -> &VecDeque<Action> {
        &self.past
    }

    /// Undone actions, next-to-redo first.
    #[must_use]
    pub const fn future(&self) -> &VecDeque<Action> {
        &self.future
    }

    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the size limit, trimming the oldest past entries if needed.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size.max(1);
        while self.len() > self.max_size && !self.past.is_empty() {
            self.past.pop_front();
        }
        while self.len() > self.max_size {
            self.future.pop_back();
        }
    }

    /// Total retained actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.past.len() + usize::from(self.present.is_some()) + self.future.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All actions in chronological order: past, present, then future.
    pub fn entries(&self) -> impl Iterator<Item = &Action> {
        self.past
            .iter()
            .chain(self.present.iter())
            .chain(self.future.iter())
    }

    /// Point every snapshot referencing `from` at `to`.
    pub fn rebind(&mut self, from: EntityId, to: EntityId) {
        for action in self
            .past
            .iter_mut()
            .chain(self.present.iter_mut())
            .chain(self.future.iter_mut())
        {
            action.payload.rebind(from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, NewItem};

    fn toggle(item_id: i64) -> ActionPayload {
        ActionPayload::ToggleItem {
            list_id: EntityId::Remote(1),
            item_id: EntityId::Remote(item_id),
            previous: false,
            next: true,
        }
    }

    fn record_n(log: &mut ActionLog, n: i64) -> Vec<Uuid> {
        (1..=n)
            .map(|i| log.record(toggle(i), format!("Check item {i}")).id)
            .collect()
    }

    #[test]
    fn test_record_sets_present() {
        let mut log = ActionLog::default();
        assert!(!log.can_undo());

        let id = log.record(toggle(1), "Check Milk").id;
        assert_eq!(log.present().unwrap().id, id);
        assert!(log.past().is_empty());
        assert!(log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let mut log = ActionLog::default();
        record_n(&mut log, 3);
        let sequences: Vec<u64> = log.entries().map(|a| a.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn test_undo_back_to_first() {
        let mut log = ActionLog::default();
        let ids = record_n(&mut log, 4);

        let steps = log.past().len();
        for _ in 0..steps {
            log.undo();
        }

        assert_eq!(log.present().unwrap().id, ids[0]);
        let future: Vec<Uuid> = log.future().iter().map(|a| a.id).collect();
        assert_eq!(future, ids[1..].to_vec());
        assert!(log.past().is_empty());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut log = ActionLog::default();
        record_n(&mut log, 3);
        let before = log.clone();

        log.undo();
        log.redo();
        assert_eq!(log, before);
    }

    #[test]
    fn test_undo_sole_action() {
        let mut log = ActionLog::default();
        let id = log.record(toggle(1), "Check Milk").id;

        log.undo();
        assert!(log.present().is_none());
        assert_eq!(log.next_redo().unwrap().id, id);

        // Nothing left to undo
        log.undo();
        assert_eq!(log.future().len(), 1);

        log.redo();
        assert_eq!(log.present().unwrap().id, id);
    }

    #[test]
    fn test_record_clears_future() {
        let mut log = ActionLog::default();
        record_n(&mut log, 3);
        log.undo();
        log.undo();
        assert_eq!(log.future().len(), 2);

        log.record(toggle(9), "Check item 9");
        assert!(log.future().is_empty());
        assert!(!log.can_redo());
    }

    #[test]
    fn test_redo_without_future_is_noop() {
        let mut log = ActionLog::default();
        record_n(&mut log, 2);
        let before = log.clone();
        log.redo();
        assert_eq!(log, before);
    }

    #[test]
    fn test_max_size_drops_oldest() {
        let mut log = ActionLog::new(3);
        let ids = record_n(&mut log, 10);

        assert!(log.past().len() <= 3);
        assert_eq!(log.len(), 3);
        let retained: Vec<Uuid> = log.entries().map(|a| a.id).collect();
        assert_eq!(retained, ids[7..].to_vec());
    }

    #[test]
    fn test_set_max_size_trims() {
        let mut log = ActionLog::new(10);
        record_n(&mut log, 6);
        log.set_max_size(2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut log = ActionLog::default();
        record_n(&mut log, 3);
        log.undo();
        log.clear();
        assert!(log.is_empty());
        assert!(!log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn test_rebind_reaches_every_partition() {
        let mut log = ActionLog::default();
        let milk = Item::from_new(EntityId::Remote(5), EntityId::Remote(1), NewItem::named("Milk"));
        log.record(
            ActionPayload::AddItem {
                list_id: EntityId::Remote(1),
                item: milk,
            },
            "Add Milk",
        );
        log.record(toggle(5), "Check Milk");
        log.undo();

        log.rebind(EntityId::Remote(5), EntityId::Remote(55));

        for action in log.entries() {
            match &action.payload {
                ActionPayload::AddItem { item, .. } => assert_eq!(item.id, EntityId::Remote(55)),
                ActionPayload::ToggleItem { item_id, .. } => {
                    assert_eq!(*item_id, EntityId::Remote(55));
                },
                other => panic!("unexpected payload {other:?}"),
            }
        }
    }

    #[test]
    fn test_serde_round_trip_keeps_partitions() {
        let mut log = ActionLog::new(5);
        record_n(&mut log, 3);
        log.undo();

        let json = serde_json::to_string(&log).unwrap();
        let restored: ActionLog = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, log);
    }
}
