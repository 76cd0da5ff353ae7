//! taskboard - a small task tracker with scheduling.
//!
//! Three record kinds share one id space: plain tasks, epics (containers
//! whose status and schedule are derived from their subtasks) and subtasks
//! (each owned by exactly one epic). The engine in [`board`] keeps the
//! collections consistent, tracks which records were viewed, and refuses
//! schedule overlaps. Persistence backends in [`store`] save and restore
//! whole-board snapshots; the HTTP server in [`api`] is a thin layer over
//! one engine instance.

pub mod api;
pub mod board;
pub mod config;
pub mod store;
pub mod task;

pub use config::Config;
