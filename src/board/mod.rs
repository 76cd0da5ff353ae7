//! Task engine.
//!
//! [`TaskBoard`] owns the authoritative collections of tasks, epics and
//! subtasks, the shared id counter, the view history and the priority index.
//! Every mutating operation either fully applies its invariant-preserving
//! side effects or fails before touching shared state.
//!
//! # Invariants
//! - ids are unique across all three kinds and never reused
//! - every subtask's epic id resolves to a live epic; deleting an epic
//!   cascades to its subtasks
//! - an epic's status and schedule are recomputed immediately after any
//!   subtask mutation, never left stale
//! - no two schedulable items hold overlapping time windows
//!
//! The engine is a plain synchronous structure with no interior locking;
//! callers in concurrent contexts must serialize access externally (the HTTP
//! layer keeps one `RwLock` around it). Get-by-id operations append to the
//! view history and therefore count as mutations.

pub mod history;
pub mod priority;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::task::{
    derive_schedule, derive_status, EpicInput, SubtaskInput, TaskId, TaskInput, TaskKind,
    TaskRecord, TaskStatus,
};

pub use history::ViewHistory;
pub use priority::PriorityIndex;

/// Errors reported by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("{kind} with id {id} does not exist")]
    NotFound { kind: &'static str, id: TaskId },

    #[error("epic with id {0} does not exist")]
    UnknownEpic(TaskId),

    #[error("time window overlaps an already scheduled item")]
    WindowConflict,
}

impl BoardError {
    fn task_not_found(id: TaskId) -> Self {
        BoardError::NotFound { kind: "task", id }
    }

    fn epic_not_found(id: TaskId) -> Self {
        BoardError::NotFound { kind: "epic", id }
    }

    fn subtask_not_found(id: TaskId) -> Self {
        BoardError::NotFound { kind: "subtask", id }
    }
}

/// Full engine state for the persistence adapters.
///
/// `history` is the sequence of viewed ids, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub tasks: Vec<TaskRecord>,
    pub epics: Vec<TaskRecord>,
    pub subtasks: Vec<TaskRecord>,
    pub history: Vec<TaskId>,
}

/// The in-memory task engine.
#[derive(Debug)]
pub struct TaskBoard {
    tasks: HashMap<TaskId, TaskRecord>,
    epics: HashMap<TaskId, TaskRecord>,
    subtasks: HashMap<TaskId, TaskRecord>,
    next_id: TaskId,
    history: ViewHistory,
    schedule: PriorityIndex,
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBoard {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            epics: HashMap::new(),
            subtasks: HashMap::new(),
            next_id: 1,
            history: ViewHistory::new(),
            schedule: PriorityIndex::new(),
        }
    }

    // --- create ---

    /// Create a plain task.
    ///
    /// # Errors
    /// [`BoardError::WindowConflict`] if the task's time window overlaps an
    /// existing scheduled item; no id is consumed in that case.
    pub fn create_task(&mut self, input: TaskInput) -> Result<TaskId, BoardError> {
        let mut record = build_record(0, sanitize(input), TaskKind::Task);
        if !self.schedule.is_valid_window(record.window(), None) {
            return Err(BoardError::WindowConflict);
        }
        let id = self.generate_id();
        record.id = id;
        self.schedule.set(id, record.window());
        self.tasks.insert(id, record);
        Ok(id)
    }

    /// Create an epic. Status and schedule start at the empty-subtask rule
    /// (NEW, no window) and are derived from subtasks afterwards.
    pub fn create_epic(&mut self, input: EpicInput) -> TaskId {
        let id = self.generate_id();
        let record = TaskRecord {
            id,
            name: input.name,
            description: input.description,
            status: TaskStatus::New,
            start_time: None,
            duration_minutes: None,
            kind: TaskKind::Epic {
                subtasks: Vec::new(),
                end_time: None,
            },
        };
        self.epics.insert(id, record);
        id
    }

    /// Create a subtask attached to an existing epic.
    ///
    /// # Errors
    /// [`BoardError::WindowConflict`] on an overlapping time window,
    /// [`BoardError::UnknownEpic`] if the referenced epic does not exist.
    /// Nothing is stored on failure.
    pub fn create_subtask(&mut self, input: SubtaskInput) -> Result<TaskId, BoardError> {
        let epic_id = input.epic_id;
        let mut record = build_record(0, sanitize(input.task), TaskKind::Subtask { epic_id });
        if !self.schedule.is_valid_window(record.window(), None) {
            return Err(BoardError::WindowConflict);
        }
        if !self.epics.contains_key(&epic_id) {
            return Err(BoardError::UnknownEpic(epic_id));
        }

        let id = self.generate_id();
        record.id = id;
        self.schedule.set(id, record.window());
        self.subtasks.insert(id, record);
        self.attach_to_epic(epic_id, id);
        self.refresh_epic(epic_id);
        Ok(id)
    }

    // --- update (full replacement, id preserved) ---

    pub fn update_task(&mut self, id: TaskId, input: TaskInput) -> Result<(), BoardError> {
        if !self.tasks.contains_key(&id) {
            return Err(BoardError::task_not_found(id));
        }
        let record = build_record(id, sanitize(input), TaskKind::Task);
        if !self.schedule.is_valid_window(record.window(), Some(id)) {
            return Err(BoardError::WindowConflict);
        }
        self.schedule.set(id, record.window());
        self.tasks.insert(id, record);
        Ok(())
    }

    /// Replace an epic's own fields. The existing subtask list is re-attached
    /// to the replacement record, so an epic update never orphans subtasks.
    pub fn update_epic(&mut self, id: TaskId, input: EpicInput) -> Result<(), BoardError> {
        let kept_subtasks = self
            .epics
            .get(&id)
            .ok_or_else(|| BoardError::epic_not_found(id))?
            .subtask_ids()
            .map(<[TaskId]>::to_vec)
            .unwrap_or_default();

        let record = TaskRecord {
            id,
            name: input.name,
            description: input.description,
            status: TaskStatus::New,
            start_time: None,
            duration_minutes: None,
            kind: TaskKind::Epic {
                subtasks: kept_subtasks,
                end_time: None,
            },
        };
        self.epics.insert(id, record);
        self.refresh_epic(id);
        Ok(())
    }

    /// Replace a subtask. Moving it to a different epic detaches it from the
    /// old epic and recomputes both epics' aggregates.
    pub fn update_subtask(&mut self, id: TaskId, input: SubtaskInput) -> Result<(), BoardError> {
        let old_epic_id = match self.subtasks.get(&id) {
            Some(existing) => existing.epic_id().unwrap_or(input.epic_id),
            None => return Err(BoardError::subtask_not_found(id)),
        };
        let new_epic_id = input.epic_id;
        if !self.epics.contains_key(&new_epic_id) {
            return Err(BoardError::UnknownEpic(new_epic_id));
        }
        let record = build_record(id, sanitize(input.task), TaskKind::Subtask { epic_id: new_epic_id });
        if !self.schedule.is_valid_window(record.window(), Some(id)) {
            return Err(BoardError::WindowConflict);
        }

        if old_epic_id != new_epic_id {
            self.detach_from_epic(old_epic_id, id);
            self.attach_to_epic(new_epic_id, id);
        }
        self.schedule.set(id, record.window());
        self.subtasks.insert(id, record);
        if old_epic_id != new_epic_id {
            self.refresh_epic(old_epic_id);
        }
        self.refresh_epic(new_epic_id);
        Ok(())
    }

    // --- get by id (records the view) ---

    pub fn task(&mut self, id: TaskId) -> Result<&TaskRecord, BoardError> {
        let record = self
            .tasks
            .get(&id)
            .ok_or_else(|| BoardError::task_not_found(id))?;
        self.history.record_view(id);
        Ok(record)
    }

    pub fn epic(&mut self, id: TaskId) -> Result<&TaskRecord, BoardError> {
        let record = self
            .epics
            .get(&id)
            .ok_or_else(|| BoardError::epic_not_found(id))?;
        self.history.record_view(id);
        Ok(record)
    }

    pub fn subtask(&mut self, id: TaskId) -> Result<&TaskRecord, BoardError> {
        let record = self
            .subtasks
            .get(&id)
            .ok_or_else(|| BoardError::subtask_not_found(id))?;
        self.history.record_view(id);
        Ok(record)
    }

    // --- delete ---

    pub fn delete_task(&mut self, id: TaskId) -> Result<(), BoardError> {
        self.tasks
            .remove(&id)
            .ok_or_else(|| BoardError::task_not_found(id))?;
        self.history.remove(id);
        self.schedule.remove(id);
        Ok(())
    }

    /// Delete an epic and cascade to all of its subtasks.
    pub fn delete_epic(&mut self, id: TaskId) -> Result<(), BoardError> {
        let epic = self
            .epics
            .remove(&id)
            .ok_or_else(|| BoardError::epic_not_found(id))?;
        if let Some(subtask_ids) = epic.subtask_ids() {
            for &subtask_id in subtask_ids {
                self.subtasks.remove(&subtask_id);
                self.history.remove(subtask_id);
                self.schedule.remove(subtask_id);
            }
        }
        self.history.remove(id);
        Ok(())
    }

    pub fn delete_subtask(&mut self, id: TaskId) -> Result<(), BoardError> {
        let subtask = self
            .subtasks
            .remove(&id)
            .ok_or_else(|| BoardError::subtask_not_found(id))?;
        self.history.remove(id);
        self.schedule.remove(id);
        if let Some(epic_id) = subtask.epic_id() {
            self.detach_from_epic(epic_id, id);
            self.refresh_epic(epic_id);
        }
        Ok(())
    }

    // --- bulk clears ---

    pub fn clear_tasks(&mut self) {
        for id in self.tasks.keys().copied().collect::<Vec<_>>() {
            self.history.remove(id);
            self.schedule.remove(id);
        }
        self.tasks.clear();
    }

    /// Clear every epic. Implies clearing every subtask.
    pub fn clear_epics(&mut self) {
        for id in self.epics.keys().copied().collect::<Vec<_>>() {
            self.history.remove(id);
        }
        self.epics.clear();
        self.clear_subtasks();
    }

    /// Clear every subtask and reset each remaining epic to the
    /// empty-subtask-list rule.
    pub fn clear_subtasks(&mut self) {
        for id in self.subtasks.keys().copied().collect::<Vec<_>>() {
            self.history.remove(id);
            self.schedule.remove(id);
        }
        self.subtasks.clear();
        for epic_id in self.epics.keys().copied().collect::<Vec<_>>() {
            if let Some(epic) = self.epics.get_mut(&epic_id) {
                if let TaskKind::Epic { subtasks, .. } = &mut epic.kind {
                    subtasks.clear();
                }
            }
            self.refresh_epic(epic_id);
        }
    }

    pub fn clear_all(&mut self) {
        self.clear_tasks();
        self.clear_epics();
    }

    // --- views ---

    /// All plain tasks, ascending by id.
    pub fn tasks(&self) -> Vec<&TaskRecord> {
        sorted_by_id(self.tasks.values())
    }

    /// All epics, ascending by id.
    pub fn epics(&self) -> Vec<&TaskRecord> {
        sorted_by_id(self.epics.values())
    }

    /// All subtasks, ascending by id.
    pub fn subtasks(&self) -> Vec<&TaskRecord> {
        sorted_by_id(self.subtasks.values())
    }

    /// Subtasks of one epic, in insertion order.
    pub fn epic_subtasks(&self, epic_id: TaskId) -> Result<Vec<&TaskRecord>, BoardError> {
        let epic = self
            .epics
            .get(&epic_id)
            .ok_or_else(|| BoardError::epic_not_found(epic_id))?;
        Ok(epic
            .subtask_ids()
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.subtasks.get(id))
            .collect())
    }

    /// Schedulable tasks and subtasks ascending by start time. Items without
    /// a full time window are excluded; epics never appear.
    pub fn prioritized(&self) -> Vec<&TaskRecord> {
        self.schedule
            .ordered_ids()
            .filter_map(|id| self.tasks.get(&id).or_else(|| self.subtasks.get(&id)))
            .collect()
    }

    /// Viewed records, oldest first, most recently viewed last.
    pub fn history(&self) -> Vec<&TaskRecord> {
        self.history
            .ids()
            .into_iter()
            .filter_map(|id| self.record(id))
            .collect()
    }

    fn record(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks
            .get(&id)
            .or_else(|| self.epics.get(&id))
            .or_else(|| self.subtasks.get(&id))
    }

    // --- persistence contract ---

    /// Clone the full engine state for a persistence adapter.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            tasks: sorted_owned(self.tasks.values()),
            epics: sorted_owned(self.epics.values()),
            subtasks: sorted_owned(self.subtasks.values()),
            history: self.history.ids(),
        }
    }

    /// Replace the engine state with a snapshot.
    ///
    /// Ids are preserved and the shared counter resumes at max(existing)+1.
    /// Epic subtask lists are rebuilt from the subtasks' own epic ids, so the
    /// snapshot may carry subtasks before or after their owning epic. Records
    /// that violate referential integrity (a subtask whose epic is missing,
    /// a history id that resolves to nothing) are skipped with a warning.
    pub fn restore(&mut self, snapshot: BoardSnapshot) {
        self.tasks.clear();
        self.epics.clear();
        self.subtasks.clear();
        self.history.clear();
        self.schedule.clear();

        let mut max_id = 0;

        for mut record in snapshot.epics {
            if let TaskKind::Epic { subtasks, .. } = &mut record.kind {
                subtasks.clear();
            }
            max_id = max_id.max(record.id);
            self.epics.insert(record.id, record);
        }
        for record in snapshot.tasks {
            max_id = max_id.max(record.id);
            self.schedule.set(record.id, record.window());
            self.tasks.insert(record.id, record);
        }
        for record in snapshot.subtasks {
            // skipped records still advance the counter: their ids were
            // consumed once and must not be handed out again
            max_id = max_id.max(record.id);
            let Some(epic_id) = record.epic_id() else {
                warn!(id = record.id, "skipping restored subtask without an epic id");
                continue;
            };
            if !self.epics.contains_key(&epic_id) {
                warn!(
                    id = record.id,
                    epic_id, "skipping restored subtask referencing a missing epic"
                );
                continue;
            }
            self.schedule.set(record.id, record.window());
            self.attach_to_epic(epic_id, record.id);
            self.subtasks.insert(record.id, record);
        }

        for id in snapshot.history {
            if self.record(id).is_some() {
                self.history.record_view(id);
            } else {
                warn!(id, "skipping history entry for an unknown id");
            }
        }

        for epic_id in self.epics.keys().copied().collect::<Vec<_>>() {
            self.refresh_epic(epic_id);
        }
        self.next_id = max_id + 1;
    }

    // --- internals ---

    fn generate_id(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn attach_to_epic(&mut self, epic_id: TaskId, subtask_id: TaskId) {
        if let Some(epic) = self.epics.get_mut(&epic_id) {
            if let TaskKind::Epic { subtasks, .. } = &mut epic.kind {
                if !subtasks.contains(&subtask_id) {
                    subtasks.push(subtask_id);
                }
            }
        }
    }

    fn detach_from_epic(&mut self, epic_id: TaskId, subtask_id: TaskId) {
        if let Some(epic) = self.epics.get_mut(&epic_id) {
            if let TaskKind::Epic { subtasks, .. } = &mut epic.kind {
                subtasks.retain(|&id| id != subtask_id);
            }
        }
    }

    /// Recompute an epic's status and schedule from its current subtask set.
    fn refresh_epic(&mut self, epic_id: TaskId) {
        let Some(subtask_ids) = self
            .epics
            .get(&epic_id)
            .and_then(|epic| epic.subtask_ids().map(<[TaskId]>::to_vec))
        else {
            return;
        };

        let subtasks: Vec<&TaskRecord> = subtask_ids
            .iter()
            .filter_map(|id| self.subtasks.get(id))
            .collect();
        let status = derive_status(subtasks.iter().map(|record| record.status));
        let schedule = derive_schedule(subtasks.into_iter());

        if let Some(epic) = self.epics.get_mut(&epic_id) {
            epic.status = status;
            epic.start_time = schedule.start_time;
            epic.duration_minutes = schedule.duration_minutes;
            if let TaskKind::Epic { end_time, .. } = &mut epic.kind {
                *end_time = schedule.end_time;
            }
        }
    }
}

/// Clamp caller-supplied fields to the model's rules.
///
/// A negative duration becomes zero, matching the entity model's "clamped,
/// logged, not an error" contract.
fn sanitize(mut input: TaskInput) -> TaskInput {
    if let Some(minutes) = input.duration_minutes {
        if minutes < 0 {
            warn!(minutes, name = %input.name, "negative duration clamped to zero");
            input.duration_minutes = Some(0);
        }
    }
    input
}

fn build_record(id: TaskId, input: TaskInput, kind: TaskKind) -> TaskRecord {
    TaskRecord {
        id,
        name: input.name,
        description: input.description,
        status: input.status,
        start_time: input.start_time,
        duration_minutes: input.duration_minutes,
        kind,
    }
}

fn sorted_by_id<'a>(records: impl Iterator<Item = &'a TaskRecord>) -> Vec<&'a TaskRecord> {
    let mut ordered: Vec<&TaskRecord> = records.collect();
    ordered.sort_by_key(|record| record.id);
    ordered
}

fn sorted_owned<'a>(records: impl Iterator<Item = &'a TaskRecord>) -> Vec<TaskRecord> {
    let mut ordered: Vec<TaskRecord> = records.cloned().collect();
    ordered.sort_by_key(|record| record.id);
    ordered
}
