//! JSON operations endpoint
//!
//! A small axum app for operators: database figures, process and system
//! memory, per-shard statistics and a raw command runner. It shares the
//! [`Database`] handle with the RESP server.

mod handlers;

use crate::clock::SharedClock;
use crate::db::Database;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

pub use handlers::{AppState, CommandRequest, CommandResponse, SystemStats};

/// How long a system statistics sample is served before refreshing
pub const SYSTEM_STATS_TTL: std::time::Duration = std::time::Duration::from_secs(5);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/info", get(handlers::info))
        .route("/stats", get(handlers::stats))
        .route("/shards", get(handlers::shards))
        .route("/command", post(handlers::execute_command))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve the endpoint
pub async fn run(addr: &str, db: Database, clock: SharedClock) -> anyhow::Result<()> {
    let app = router(AppState::new(db, clock));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Operations endpoint available at http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
