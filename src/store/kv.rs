//! Remote key-value store.
//!
//! Talks to the standalone kv-server binary. The protocol is three routes:
//! `GET /register` hands out an access token, `POST /save/{key}?API_TOKEN=`
//! stores a value, `GET /load/{key}?API_TOKEN=` reads one back (404 when the
//! key was never saved).
//!
//! Records are stored one per key as `ID_<id>` JSON, plus `History` (the id
//! list) and `NextId` (one past the highest id ever saved). Load scans
//! `ID_1..NextId` and skips keys that do not resolve. The protocol has no
//! delete, so keys of removed records linger server side until overwritten.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{StoreError, TaskStore};
use crate::board::BoardSnapshot;
use crate::task::{TaskId, TaskKind, TaskRecord};

const NEXT_ID_KEY: &str = "NextId";
const HISTORY_KEY: &str = "History";

/// Thin HTTP client for the key-value server.
#[derive(Debug, Clone)]
pub struct KvClient {
    base_url: String,
    client: reqwest::Client,
    token: String,
}

impl KvClient {
    /// Register with the server and obtain an access token.
    pub async fn connect(base_url: &str) -> Result<Self, StoreError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::new();
        let token = client
            .get(format!("{base_url}/register"))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(%base_url, "registered with key-value server");
        Ok(Self {
            base_url,
            client,
            token,
        })
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.client
            .post(format!(
                "{}/save/{key}?API_TOKEN={}",
                self.base_url, self.token
            ))
            .body(value.to_string())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Read a value. Absent keys come back as `None`.
    pub async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let response = self
            .client
            .get(format!(
                "{}/load/{key}?API_TOKEN={}",
                self.base_url, self.token
            ))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.text().await?))
    }
}

/// Snapshot store backed by a [`KvClient`].
#[derive(Debug, Clone)]
pub struct KvStore {
    client: KvClient,
}

impl KvStore {
    pub async fn connect(base_url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: KvClient::connect(base_url).await?,
        })
    }
}

#[async_trait]
impl TaskStore for KvStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn load(&self) -> Result<BoardSnapshot, StoreError> {
        let Some(raw_next) = self.client.load(NEXT_ID_KEY).await? else {
            info!("no saved state on key-value server, starting empty");
            return Ok(BoardSnapshot::default());
        };
        let next_id = raw_next
            .trim()
            .parse::<TaskId>()
            .map_err(|_| StoreError::Malformed(format!("bad {NEXT_ID_KEY} value: {raw_next}")))?;

        let mut snapshot = BoardSnapshot::default();
        for id in 1..next_id {
            let Some(raw) = self.client.load(&format!("ID_{id}")).await? else {
                continue;
            };
            let record: TaskRecord = serde_json::from_str(&raw)?;
            match record.kind {
                TaskKind::Task => snapshot.tasks.push(record),
                TaskKind::Epic { .. } => snapshot.epics.push(record),
                TaskKind::Subtask { .. } => snapshot.subtasks.push(record),
            }
        }

        if let Some(raw) = self.client.load(HISTORY_KEY).await? {
            snapshot.history = serde_json::from_str(&raw)?;
        }

        Ok(snapshot)
    }

    async fn save(&self, snapshot: &BoardSnapshot) -> Result<(), StoreError> {
        let mut max_id = 0;
        for record in snapshot
            .tasks
            .iter()
            .chain(snapshot.epics.iter())
            .chain(snapshot.subtasks.iter())
        {
            let key = format!("ID_{}", record.id);
            self.client
                .put(&key, &serde_json::to_string(record)?)
                .await?;
            max_id = max_id.max(record.id);
        }
        self.client
            .put(HISTORY_KEY, &serde_json::to_string(&snapshot.history)?)
            .await?;
        self.client.put(NEXT_ID_KEY, &(max_id + 1).to_string()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::kv::{router, KvState};
    use crate::board::TaskBoard;
    use crate::task::{EpicInput, SubtaskInput, TaskInput, TaskStatus};
    use chrono::NaiveDate;
    use std::sync::Arc;

    async fn spawn_server() -> String {
        let state = Arc::new(KvState::new());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn populated_snapshot() -> BoardSnapshot {
        let mut board = TaskBoard::new();
        let t = board
            .create_task(TaskInput {
                name: "water plants".into(),
                description: String::new(),
                status: TaskStatus::New,
                start_time: NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_opt(9, 0, 0),
                duration_minutes: Some(15),
            })
            .unwrap();
        let e = board.create_epic(EpicInput {
            name: "spring cleaning".into(),
            description: "the whole flat".into(),
        });
        board
            .create_subtask(SubtaskInput {
                task: TaskInput {
                    name: "windows".into(),
                    description: String::new(),
                    status: TaskStatus::InProgress,
                    start_time: None,
                    duration_minutes: None,
                },
                epic_id: e,
            })
            .unwrap();
        board.task(t).unwrap();
        board.epic(e).unwrap();
        board.snapshot()
    }

    #[tokio::test]
    async fn raw_client_round_trips_values() {
        let url = spawn_server().await;
        let client = KvClient::connect(&url).await.unwrap();

        client.put("greeting", "hello").await.unwrap();
        assert_eq!(client.load("greeting").await.unwrap().as_deref(), Some("hello"));
        assert_eq!(client.load("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_the_server() {
        let url = spawn_server().await;
        let store = KvStore::connect(&url).await.unwrap();

        let snapshot = populated_snapshot();
        store.save(&snapshot).await.unwrap();
        assert_eq!(store.load().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn fresh_server_loads_as_empty() {
        let url = spawn_server().await;
        let store = KvStore::connect(&url).await.unwrap();
        assert_eq!(store.load().await.unwrap(), BoardSnapshot::default());
    }

    #[tokio::test]
    async fn two_clients_share_saved_state() {
        let url = spawn_server().await;
        let writer = KvStore::connect(&url).await.unwrap();
        let snapshot = populated_snapshot();
        writer.save(&snapshot).await.unwrap();

        let reader = KvStore::connect(&url).await.unwrap();
        assert_eq!(reader.load().await.unwrap(), snapshot);
    }
}
