//! Epic aggregate derivation.
//!
//! An epic's status and schedule are functions of its current subtask set,
//! nothing else. The engine calls these after every subtask mutation so the
//! stored epic is never stale.

use chrono::NaiveDateTime;

use super::record::{TaskRecord, TaskStatus};

/// Derived schedule for an epic.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpicSchedule {
    /// Earliest subtask start time present, if any.
    pub start_time: Option<NaiveDateTime>,
    /// Sum of subtask durations, negatives clamped to zero. `None` only when
    /// the epic has no subtasks at all.
    pub duration_minutes: Option<i64>,
    /// Latest subtask end time present, if any.
    pub end_time: Option<NaiveDateTime>,
}

/// Epic status rule.
///
/// No subtasks: NEW. All subtasks NEW: NEW. All subtasks DONE: DONE. Every
/// other combination (mixed, or any IN_PROGRESS present): IN_PROGRESS.
pub fn derive_status(statuses: impl IntoIterator<Item = TaskStatus>) -> TaskStatus {
    let mut empty = true;
    let mut all_new = true;
    let mut all_done = true;

    for status in statuses {
        empty = false;
        if status != TaskStatus::New {
            all_new = false;
        }
        if status != TaskStatus::Done {
            all_done = false;
        }
    }

    if empty || all_new {
        TaskStatus::New
    } else if all_done {
        TaskStatus::Done
    } else {
        TaskStatus::InProgress
    }
}

/// Epic schedule rule.
///
/// Comparisons use the timestamp's total order directly; subtasks without a
/// start (or end) time simply do not take part in the min/max.
pub fn derive_schedule<'a>(subtasks: impl IntoIterator<Item = &'a TaskRecord>) -> EpicSchedule {
    let mut empty = true;
    let mut start: Option<NaiveDateTime> = None;
    let mut end: Option<NaiveDateTime> = None;
    let mut total_minutes: i64 = 0;

    for subtask in subtasks {
        empty = false;
        if let Some(sub_start) = subtask.start_time {
            start = Some(start.map_or(sub_start, |s| s.min(sub_start)));
        }
        if let Some(minutes) = subtask.duration_minutes {
            total_minutes += minutes.max(0);
        }
        if let Some(sub_end) = subtask.end_time() {
            end = Some(end.map_or(sub_end, |e| e.max(sub_end)));
        }
    }

    if empty {
        EpicSchedule::default()
    } else {
        EpicSchedule {
            start_time: start,
            duration_minutes: Some(total_minutes),
            end_time: end,
        }
    }
}
