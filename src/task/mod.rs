//! Task entity model - records, statuses and the epic derivation rules.
//!
//! Everything in this module is pure data: the derivation functions have no
//! side effects on the engine. The engine (`crate::board`) owns the
//! collections and decides when to recompute.

pub mod epic;
pub mod record;

pub use epic::{derive_schedule, derive_status, EpicSchedule};
pub use record::{
    EpicInput, SubtaskInput, TaskId, TaskInput, TaskKind, TaskRecord, TaskStatus, TimeWindow,
};
