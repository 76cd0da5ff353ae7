//! kv-server - Standalone Key-Value Server Entry Point
//!
//! Runs the key-value service the `kv` persistence backend talks to.
//! Configuration:
//! - `KV_HOST` - Optional. Defaults to `127.0.0.1`.
//! - `KV_PORT` - Optional. Defaults to `8078`.

use std::sync::Arc;

use taskboard::api::kv::{router, KvState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = std::env::var("KV_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("KV_PORT").unwrap_or_else(|_| "8078".to_string());

    let state = Arc::new(KvState::new());
    info!(token = %state.token(), "API token for this run");

    let addr = format!("{host}:{port}");
    info!("Starting key-value server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
