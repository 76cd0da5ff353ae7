//! Standalone key-value server.
//!
//! A deliberately small service: an in-memory string map behind three routes.
//!
//! - `GET /register` - returns the access token for this server run
//! - `POST /save/{key}?API_TOKEN=` - store the request body under the key
//! - `GET /load/{key}?API_TOKEN=` - return the stored value, 404 if absent
//!
//! Save and load require the token from `/register`; the literal token
//! `DEBUG` is also accepted for manual poking with curl. Served by the
//! `kv-server` binary and used by the `kv` persistence backend.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Shared server state: the access token and the stored values.
pub struct KvState {
    token: String,
    data: RwLock<HashMap<String, String>>,
}

impl KvState {
    pub fn new() -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn authorized(&self, token: Option<&str>) -> bool {
        matches!(token, Some(t) if t == self.token || t == "DEBUG")
    }
}

impl Default for KvState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    #[serde(rename = "API_TOKEN")]
    token: Option<String>,
}

pub fn router(state: Arc<KvState>) -> Router {
    Router::new()
        .route("/register", get(register))
        .route("/save/:key", post(save))
        .route("/load/:key", get(load))
        .with_state(state)
}

async fn register(State(state): State<Arc<KvState>>) -> String {
    state.token.clone()
}

async fn save(
    State(state): State<Arc<KvState>>,
    Path(key): Path<String>,
    Query(query): Query<TokenQuery>,
    body: String,
) -> StatusCode {
    if !state.authorized(query.token.as_deref()) {
        return StatusCode::FORBIDDEN;
    }
    if body.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    debug!(%key, bytes = body.len(), "stored value");
    state.data.write().await.insert(key, body);
    StatusCode::OK
}

async fn load(
    State(state): State<Arc<KvState>>,
    Path(key): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Response {
    if !state.authorized(query.token.as_deref()) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match state.data.read().await.get(&key) {
        Some(value) => (StatusCode::OK, value.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn() -> (String, String) {
        let state = Arc::new(KvState::new());
        let token = state.token().to_string();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        (format!("http://{addr}"), token)
    }

    #[tokio::test]
    async fn register_returns_the_token() {
        let (url, token) = spawn().await;
        let body = reqwest::get(format!("{url}/register"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, token);
    }

    #[tokio::test]
    async fn save_requires_a_valid_token() {
        let (url, token) = spawn().await;
        let client = reqwest::Client::new();

        let forbidden = client
            .post(format!("{url}/save/k?API_TOKEN=wrong"))
            .body("v")
            .send()
            .await
            .unwrap();
        assert_eq!(forbidden.status(), reqwest::StatusCode::FORBIDDEN);

        let ok = client
            .post(format!("{url}/save/k?API_TOKEN={token}"))
            .body("v")
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status(), reqwest::StatusCode::OK);

        // DEBUG token is accepted for manual testing
        let debug = client
            .post(format!("{url}/save/k2?API_TOKEN=DEBUG"))
            .body("v2")
            .send()
            .await
            .unwrap();
        assert_eq!(debug.status(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_values_are_rejected() {
        let (url, token) = spawn().await;
        let response = reqwest::Client::new()
            .post(format!("{url}/save/k?API_TOKEN={token}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn load_round_trips_and_404s_missing_keys() {
        let (url, token) = spawn().await;
        let client = reqwest::Client::new();

        client
            .post(format!("{url}/save/greeting?API_TOKEN={token}"))
            .body("hello")
            .send()
            .await
            .unwrap();

        let loaded = client
            .get(format!("{url}/load/greeting?API_TOKEN={token}"))
            .send()
            .await
            .unwrap();
        assert_eq!(loaded.text().await.unwrap(), "hello");

        let missing = client
            .get(format!("{url}/load/absent?API_TOKEN={token}"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
