//! HTTP handlers

use crate::cache::TtlCache;
use crate::clock::SharedClock;
use crate::cluster::ShardStats;
use crate::db::{Database, DbError, DbInfo};
use crate::protocol::Frame;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use sysinfo::System;
use tracing::{debug, error};

const MB: f64 = 1024.0 * 1024.0;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    system: Arc<Mutex<TtlCache<(), SystemSample>>>,
}

impl AppState {
    pub fn new(db: Database, clock: SharedClock) -> Self {
        AppState {
            db,
            system: Arc::new(Mutex::new(TtlCache::new(super::SYSTEM_STATS_TTL, clock))),
        }
    }

    /// Cached system sample, refreshed once the previous one is stale
    fn system_sample(&self) -> SystemSample {
        match self.system.lock() {
            Ok(mut cache) => cache.get_or_insert_with((), SystemSample::collect),
            Err(_) => SystemSample::collect(),
        }
    }
}

/// `{"command": "HGET user:1 username"}`
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    pub result: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SystemSample {
    total_memory_mb: f64,
    used_memory_mb: f64,
    free_memory_mb: f64,
    process_memory_mb: f64,
    cpu_usage: f64,
}

impl SystemSample {
    fn collect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        let total = sys.total_memory();
        let available = sys.available_memory();
        let process = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| sys.process(pid).map(|p| p.memory()))
            .unwrap_or(0);

        SystemSample {
            total_memory_mb: total as f64 / MB,
            used_memory_mb: total.saturating_sub(available) as f64 / MB,
            free_memory_mb: available as f64 / MB,
            process_memory_mb: process as f64 / MB,
            cpu_usage: sys.global_cpu_usage() as f64,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub total_memory_mb: f64,
    pub used_memory_mb: f64,
    pub free_memory_mb: f64,
    pub process_memory_mb: f64,
    pub cpu_usage: f64,
    pub db_memory_mb: f64,
    pub db_keys: usize,
}

/// Database failure rendered as `{"error", "status"}`
pub struct ApiError(DbError);

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            DbError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("Request failed: {}", self.0);
        let body = serde_json::json!({
            "error": self.0.to_string(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

pub async fn info(State(state): State<AppState>) -> Result<Json<DbInfo>, ApiError> {
    Ok(Json(state.db.info().await?))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<SystemStats>, ApiError> {
    let store = state.db.backend().stats().await?;
    let sample = state.system_sample();

    Ok(Json(SystemStats {
        total_memory_mb: sample.total_memory_mb,
        used_memory_mb: sample.used_memory_mb,
        free_memory_mb: sample.free_memory_mb,
        process_memory_mb: sample.process_memory_mb,
        cpu_usage: sample.cpu_usage,
        db_memory_mb: store.used_memory_bytes as f64 / MB,
        db_keys: store.active_keys,
    }))
}

pub async fn shards(State(state): State<AppState>) -> Result<Json<Vec<ShardStats>>, ApiError> {
    Ok(Json(state.db.backend().shard_details().await?))
}

/// Run a whitespace separated command line
pub async fn execute_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> (StatusCode, Json<CommandResponse>) {
    debug!("Executing command: {}", req.command);

    let mut parts = req.command.split_whitespace();
    let Some(name) = parts.next() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(CommandResponse {
                success: false,
                result: "Empty command".to_string(),
            }),
        );
    };
    let frame = Frame::command(name, parts.map(|p| p.to_string()));

    match state.db.execute(frame).await {
        Ok(reply) => (
            StatusCode::OK,
            Json(CommandResponse {
                success: !reply.is_error(),
                result: reply.to_text(),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(CommandResponse {
                success: false,
                result: e.to_string(),
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{self, ManualClock};
    use crate::config::Config;

    async fn state() -> AppState {
        let db = Database::open(&Config::ephemeral()).await.unwrap();
        AppState::new(db, clock::system())
    }

    fn command(text: &str) -> Json<CommandRequest> {
        Json(CommandRequest { command: text.to_string() })
    }

    #[tokio::test]
    async fn test_execute_command() {
        let state = state().await;
        let (status, Json(body)) = execute_command(State(state.clone()), command("HSET user:1 name alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert_eq!(body.result, "(integer) 1");

        let (_, Json(body)) = execute_command(State(state), command("  HGET   user:1 name ")).await;
        assert_eq!(body.result, "\"alice\"");
    }

    #[tokio::test]
    async fn test_execute_command_errors() {
        let state = state().await;
        let (status, Json(body)) = execute_command(State(state.clone()), command("   ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);

        let (status, Json(body)) = execute_command(State(state), command("NOPE")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.success);
        assert!(body.result.contains("unknown command"));
    }

    #[tokio::test]
    async fn test_info_and_shards() {
        let state = state().await;
        state.db.set("k", "v").await.unwrap();

        let Json(info) = info(State(state.clone())).await.ok().unwrap();
        assert_eq!(info.keys, 1);

        let Json(shards) = shards(State(state)).await.ok().unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].active_keys, 1);
    }

    #[tokio::test]
    async fn test_system_sample_is_cached() {
        let db = Database::open(&Config::ephemeral()).await.unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let state = AppState::new(db, clock.clone());

        let first = state.system_sample();
        assert_eq!(state.system_sample(), first);
        assert_eq!(state.system.lock().unwrap().len(), 1);

        clock.advance(super::super::SYSTEM_STATS_TTL.as_millis() as u64);
        assert_eq!(state.system.lock().unwrap().purge_expired(), 1);

        let Json(stats) = stats(State(state)).await.ok().unwrap();
        assert!(stats.total_memory_mb > 0.0);
    }
}
