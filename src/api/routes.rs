//! HTTP route handlers.
//!
//! A thin layer over [`TaskBoard`]: handlers deserialize the payload, take
//! the board lock, call one engine operation, then persist a snapshot. All
//! cross-request serialization happens through the single `RwLock`; reads
//! that record view history take the write lock like any mutation.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get};
use axum::Router;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::board::TaskBoard;
use crate::config::Config;
use crate::store::{create_task_store, TaskStore};
use crate::task::{SubtaskInput, TaskId, TaskInput, TaskRecord};

use super::types::{ApiError, EpicPayload, IdResponse};

/// Shared application state.
pub struct AppState {
    pub board: RwLock<TaskBoard>,
    pub store: Box<dyn TaskStore>,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = create_task_store(config.store, config.csv_path.clone(), &config.kv_url).await?;
    let snapshot = store.load().await?;

    let mut board = TaskBoard::new();
    board.restore(snapshot);
    info!(
        tasks = board.tasks().len(),
        epics = board.epics().len(),
        subtasks = board.subtasks().len(),
        persistent = store.is_persistent(),
        "board loaded"
    );

    let state = Arc::new(AppState {
        board: RwLock::new(board),
        store,
    });

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/tasks",
            get(list_tasks).post(create_task).delete(clear_tasks),
        )
        .route(
            "/api/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            "/api/epics",
            get(list_epics).post(create_epic).delete(clear_epics),
        )
        .route(
            "/api/epics/:id",
            get(get_epic).put(update_epic).delete(delete_epic),
        )
        .route("/api/epics/:id/subtasks", get(epic_subtasks))
        .route(
            "/api/subtasks",
            get(list_subtasks).post(create_subtask).delete(clear_subtasks),
        )
        .route(
            "/api/subtasks/:id",
            get(get_subtask).put(update_subtask).delete(delete_subtask),
        )
        .route("/api/prioritized", get(prioritized))
        .route("/api/history", get(history))
        .route("/api/all", delete(clear_all))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Snapshot the board and hand it to the store.
///
/// Called after every successful mutation, and after gets (viewing mutates
/// history). The mutation has already landed when this runs; a failed save
/// surfaces as a 500 without rolling the board back.
async fn persist(state: &AppState) -> Result<(), ApiError> {
    let snapshot = state.board.read().await.snapshot();
    state.store.save(&snapshot).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// --- tasks ---

async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<TaskRecord>> {
    Json(state.board.read().await.tasks().into_iter().cloned().collect())
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskRecord>, ApiError> {
    let record = state.board.write().await.task(id)?.clone();
    persist(&state).await?;
    Ok(Json(record))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(input): Json<TaskInput>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    let id = state.board.write().await.create_task(input)?;
    persist(&state).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
    Json(input): Json<TaskInput>,
) -> Result<StatusCode, ApiError> {
    state.board.write().await.update_task(id, input)?;
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, ApiError> {
    state.board.write().await.delete_task(id)?;
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_tasks(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.board.write().await.clear_tasks();
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- epics ---

async fn list_epics(State(state): State<Arc<AppState>>) -> Json<Vec<TaskRecord>> {
    Json(state.board.read().await.epics().into_iter().cloned().collect())
}

async fn get_epic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskRecord>, ApiError> {
    let record = state.board.write().await.epic(id)?.clone();
    persist(&state).await?;
    Ok(Json(record))
}

async fn create_epic(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EpicPayload>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    let id = state.board.write().await.create_epic(payload.into_input());
    persist(&state).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn update_epic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
    Json(payload): Json<EpicPayload>,
) -> Result<StatusCode, ApiError> {
    state.board.write().await.update_epic(id, payload.into_input())?;
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_epic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, ApiError> {
    state.board.write().await.delete_epic(id)?;
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_epics(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.board.write().await.clear_epics();
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn epic_subtasks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<Json<Vec<TaskRecord>>, ApiError> {
    let records = state
        .board
        .read()
        .await
        .epic_subtasks(id)?
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(records))
}

// --- subtasks ---

async fn list_subtasks(State(state): State<Arc<AppState>>) -> Json<Vec<TaskRecord>> {
    Json(
        state
            .board
            .read()
            .await
            .subtasks()
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn get_subtask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskRecord>, ApiError> {
    let record = state.board.write().await.subtask(id)?.clone();
    persist(&state).await?;
    Ok(Json(record))
}

async fn create_subtask(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SubtaskInput>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    let id = state.board.write().await.create_subtask(input)?;
    persist(&state).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn update_subtask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
    Json(input): Json<SubtaskInput>,
) -> Result<StatusCode, ApiError> {
    state.board.write().await.update_subtask(id, input)?;
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_subtask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, ApiError> {
    state.board.write().await.delete_subtask(id)?;
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_subtasks(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.board.write().await.clear_subtasks();
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- board-wide views ---

async fn prioritized(State(state): State<Arc<AppState>>) -> Json<Vec<TaskRecord>> {
    Json(
        state
            .board
            .read()
            .await
            .prioritized()
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn history(State(state): State<Arc<AppState>>) -> Json<Vec<TaskRecord>> {
    Json(
        state
            .board
            .read()
            .await
            .history()
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn clear_all(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.board.write().await.clear_all();
    persist(&state).await?;
    Ok(StatusCode::NO_CONTENT)
}
