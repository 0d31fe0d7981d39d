//! `GET /health` and `GET /metrics` handlers (§4.H, §6).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::metrics::{self, WorkerSnapshot};
use crate::state::{memory_used_bytes, SharedWorkerState};

#[derive(Clone)]
pub struct HealthState {
    pub worker: SharedWorkerState,
    pub heartbeat_timeout_ms: u64,
    pub prometheus: metrics_exporter_prometheus::PrometheusHandle,
}

#[derive(Serialize)]
pub struct ConcurrencySummary {
    pub limit: i64,
    pub active: i64,
    pub available: i64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub last_heartbeat_unix_ms: u64,
    pub current_job: Option<String>,
    pub concurrency: ConcurrencySummary,
    pub memory_used_bytes: u64,
}

fn snapshot(state: &HealthState) -> WorkerSnapshot {
    let limit = state.worker.concurrency_limit();
    let active = state.worker.concurrency_active();
    WorkerSnapshot {
        uptime_seconds: state.worker.uptime_seconds(),
        last_heartbeat_seconds_ago: state.worker.last_heartbeat_age_ms() / 1000,
        memory_used_bytes: memory_used_bytes(),
        is_processing: active > 0,
        concurrency_active: active,
        concurrency_limit: limit,
    }
}

/// 200 when `!isShuttingDown && now - lastHeartbeat < HEARTBEAT_TIMEOUT_MS`; 503 otherwise (§4.H).
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let snap = snapshot(&state);
    metrics::record_snapshot(&snap);

    let healthy = !state.worker.is_shutting_down()
        && state.worker.last_heartbeat_age_ms() < state.heartbeat_timeout_ms;

    let limit = state.worker.concurrency_limit();
    let active = state.worker.concurrency_active();
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        uptime_seconds: snap.uptime_seconds,
        last_heartbeat_unix_ms: state.worker.last_heartbeat_unix_ms(),
        current_job: state.worker.current_job_summary(),
        concurrency: ConcurrencySummary {
            limit,
            active,
            available: (limit - active).max(0),
        },
        memory_used_bytes: snap.memory_used_bytes,
    };

    let code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(response))
}

/// Conventional Prometheus text exposition (§4.H).
pub async fn metrics_endpoint(State(state): State<HealthState>) -> String {
    let snap = snapshot(&state);
    metrics::record_snapshot(&snap);
    state.prometheus.render()
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
