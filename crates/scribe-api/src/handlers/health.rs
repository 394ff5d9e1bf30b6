//! Liveness and queue statistics.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use scribe_jobs::QueueStats;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Worker slots running.
    pub workers: usize,
    /// Jobs waiting for a free worker.
    pub queue_depth: usize,
    pub jobs: QueueStats,
}

#[utoipa::path(get, path = "/health", tag = "System",
    responses((status = 200, description = "Service health", body = HealthResponse)))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        workers: state.workers.worker_count(),
        queue_depth: state.coordinator.queue_depth(),
        jobs: state.coordinator.stats(),
    })
}
