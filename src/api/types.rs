//! API request and response types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::board::BoardError;
use crate::store::StoreError;
use crate::task::{EpicInput, TaskId};

/// Response after creating a record.
#[derive(Debug, Clone, Serialize)]
pub struct IdResponse {
    /// Identifier assigned by the engine
    pub id: TaskId,
}

/// JSON error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Epic create/update payload.
///
/// Clients sometimes send status or schedule fields for epics; both are
/// derived from subtasks, so submitted values are logged and dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct EpicPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

impl EpicPayload {
    pub fn into_input(self) -> EpicInput {
        if self.status.is_some() || self.start_time.is_some() || self.duration_minutes.is_some() {
            warn!(name = %self.name, "ignoring submitted status/schedule for epic");
        }
        EpicInput {
            name: self.name,
            description: self.description,
        }
    }
}

/// Error responder: maps domain and persistence errors onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        let status = match err {
            BoardError::NotFound { .. } => StatusCode::NOT_FOUND,
            BoardError::UnknownEpic(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BoardError::WindowConflict => StatusCode::CONFLICT,
        };
        Self::new(status, err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "persistence failure");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}
