//! HTTP API layer.
//!
//! Endpoints (all JSON):
//! - `GET /api/health` - liveness probe
//! - `GET|POST|DELETE /api/tasks`, `GET|PUT|DELETE /api/tasks/:id`
//! - `GET|POST|DELETE /api/epics`, `GET|PUT|DELETE /api/epics/:id`,
//!   `GET /api/epics/:id/subtasks`
//! - `GET|POST|DELETE /api/subtasks`, `GET|PUT|DELETE /api/subtasks/:id`
//! - `GET /api/prioritized` - schedulable items ascending by start time
//! - `GET /api/history` - viewed records, oldest first
//! - `DELETE /api/all` - wipe the board
//!
//! The `kv` module is the standalone key-value server, exposed through the
//! `kv-server` binary.

pub mod kv;
pub mod routes;
pub mod types;

pub use routes::serve;
