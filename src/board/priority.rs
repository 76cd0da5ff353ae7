//! Priority index over schedulable items.
//!
//! Tracks every task and subtask that carries a full time window and serves
//! two purposes: the time-ordered "prioritized" view, and the window conflict
//! check run before a create or update is allowed to land. Epics never enter
//! the index; their schedule is an aggregate, not a booking.

use std::collections::{BTreeSet, HashMap};

use crate::task::{TaskId, TimeWindow};

/// Time-ordered set of scheduled windows, one per item.
///
/// Ordering is ascending by start time; items sharing a start time are
/// ordered by id, which keeps the ordering stable within a process run
/// without promising anything more.
#[derive(Debug, Default)]
pub struct PriorityIndex {
    windows: HashMap<TaskId, TimeWindow>,
    ordered: BTreeSet<(chrono::NaiveDateTime, TaskId)>,
}

impl PriorityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the window of an item, replacing any previous one. Passing
    /// `None` removes the item from the index (it is no longer schedulable).
    pub fn set(&mut self, id: TaskId, window: Option<TimeWindow>) {
        self.remove(id);
        if let Some(window) = window {
            self.windows.insert(id, window);
            self.ordered.insert((window.start, id));
        }
    }

    /// Drop an item from the index. Absent ids are a no-op.
    pub fn remove(&mut self, id: TaskId) {
        if let Some(window) = self.windows.remove(&id) {
            self.ordered.remove(&(window.start, id));
        }
    }

    /// Item ids ascending by start time.
    pub fn ordered_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.ordered.iter().map(|&(_, id)| id)
    }

    /// Whether a candidate window may be admitted.
    ///
    /// A candidate without a window is always valid. Otherwise the window
    /// must be disjoint from every indexed window except the candidate's own
    /// (`exclude` carries the id being updated, if any).
    pub fn is_valid_window(&self, candidate: Option<TimeWindow>, exclude: Option<TaskId>) -> bool {
        let Some(candidate) = candidate else {
            return true;
        };
        self.windows
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .all(|(_, window)| !candidate.overlaps(window))
    }

    pub fn clear(&mut self) {
        self.windows.clear();
        self.ordered.clear();
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
