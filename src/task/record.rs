//! Core task record with a kind discriminator.
//!
//! One tagged record type covers plain tasks, epics and subtasks. The kind
//! payload carries what is specific to each: an epic owns an ordered list of
//! subtask ids plus its derived end time, a subtask carries its owning epic
//! id. Code that needs kind-specific data matches on [`TaskKind`].
//!
//! # Invariants
//! - `id` is unique across all three kinds (one shared counter in the engine)
//! - an epic's status, start time, duration and end time are derived from its
//!   subtasks and never set by callers

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Identifier shared by tasks, epics and subtasks.
///
/// Assigned by the engine, monotonically increasing, never reused.
pub type TaskId = u32;

/// Status of a task in its lifecycle.
///
/// Plain tasks and subtasks may move between any two statuses; no transition
/// order is enforced. An epic's status is the one status the engine computes
/// instead of accepting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "DONE")]
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "NEW",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(TaskStatus::New),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Kind discriminator with kind-specific payload.
///
/// Serialized with a `type` tag (`TASK` / `EPIC` / `SUBTASK`) so records are
/// self-describing on the wire and in persisted snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskKind {
    #[serde(rename = "TASK")]
    Task,
    #[serde(rename = "EPIC")]
    Epic {
        /// Subtask ids in insertion order (not time order).
        #[serde(default)]
        subtasks: Vec<TaskId>,
        /// Latest end time among subtasks, recomputed by the engine.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_time: Option<NaiveDateTime>,
    },
    #[serde(rename = "SUBTASK")]
    Subtask {
        /// Owning epic. Must reference a live epic at all times.
        epic_id: TaskId,
    },
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Task => "TASK",
            TaskKind::Epic { .. } => "EPIC",
            TaskKind::Subtask { .. } => "SUBTASK",
        }
    }
}

/// A half-open scheduling window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Whether two windows share at least one instant.
    ///
    /// Windows that merely touch (one ends exactly when the other begins) do
    /// not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A stored task, epic or subtask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(flatten)]
    pub kind: TaskKind,
}

impl TaskRecord {
    /// Derived end time.
    ///
    /// Epics report the stored aggregate (latest subtask end); tasks and
    /// subtasks report `start + duration`, absent if either input is absent.
    pub fn end_time(&self) -> Option<NaiveDateTime> {
        match &self.kind {
            TaskKind::Epic { end_time, .. } => *end_time,
            _ => {
                let start = self.start_time?;
                let minutes = self.duration_minutes?;
                Some(start + Duration::minutes(minutes.max(0)))
            }
        }
    }

    /// Scheduling window, present only for tasks and subtasks that carry both
    /// a start time and a duration. Epics are never schedulable.
    pub fn window(&self) -> Option<TimeWindow> {
        if matches!(self.kind, TaskKind::Epic { .. }) {
            return None;
        }
        let start = self.start_time?;
        let end = self.end_time()?;
        Some(TimeWindow { start, end })
    }

    /// Owning epic id, for subtasks.
    pub fn epic_id(&self) -> Option<TaskId> {
        match self.kind {
            TaskKind::Subtask { epic_id } => Some(epic_id),
            _ => None,
        }
    }

    /// Subtask ids in insertion order, for epics.
    pub fn subtask_ids(&self) -> Option<&[TaskId]> {
        match &self.kind {
            TaskKind::Epic { subtasks, .. } => Some(subtasks),
            _ => None,
        }
    }
}

/// Caller-supplied fields for creating or replacing a task or subtask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

/// Caller-supplied fields for a subtask: task fields plus the owning epic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskInput {
    #[serde(flatten)]
    pub task: TaskInput,
    pub epic_id: TaskId,
}

/// Caller-supplied fields for an epic.
///
/// Status and schedule are always derived from subtasks, so there is nothing
/// else a caller may set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn timed_task(start: Option<NaiveDateTime>, minutes: Option<i64>) -> TaskRecord {
        TaskRecord {
            id: 1,
            name: "t".into(),
            description: String::new(),
            status: TaskStatus::New,
            start_time: start,
            duration_minutes: minutes,
            kind: TaskKind::Task,
        }
    }

    #[test]
    fn end_time_requires_start_and_duration() {
        assert_eq!(timed_task(Some(at(9, 0)), Some(90)).end_time(), Some(at(10, 30)));
        assert_eq!(timed_task(Some(at(9, 0)), None).end_time(), None);
        assert_eq!(timed_task(None, Some(90)).end_time(), None);
    }

    #[test]
    fn epic_is_never_schedulable() {
        let epic = TaskRecord {
            id: 2,
            name: "e".into(),
            description: String::new(),
            status: TaskStatus::New,
            start_time: Some(at(9, 0)),
            duration_minutes: Some(60),
            kind: TaskKind::Epic {
                subtasks: vec![],
                end_time: Some(at(10, 0)),
            },
        };
        assert_eq!(epic.window(), None);
        assert_eq!(epic.end_time(), Some(at(10, 0)));
    }

    #[test]
    fn touching_windows_do_not_overlap() {
        let a = TimeWindow { start: at(9, 30), end: at(10, 30) };
        let b = TimeWindow { start: at(10, 0), end: at(11, 0) };
        let c = TimeWindow { start: at(10, 30), end: at(11, 0) };
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn record_json_carries_type_tag() {
        let sub = TaskRecord {
            id: 3,
            name: "s".into(),
            description: "d".into(),
            status: TaskStatus::InProgress,
            start_time: None,
            duration_minutes: None,
            kind: TaskKind::Subtask { epic_id: 2 },
        };
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["type"], "SUBTASK");
        assert_eq!(json["epic_id"], 2);
        assert_eq!(json["status"], "IN_PROGRESS");
        let back: TaskRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, sub);
    }
}
