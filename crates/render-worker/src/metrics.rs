//! Prometheus-format metrics for the worker's `/metrics` surface (§4.H).

use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub mod names {
    pub const UPTIME_SECONDS: &str = "worker_uptime_seconds";
    pub const LAST_HEARTBEAT_SECONDS: &str = "worker_last_heartbeat_seconds";
    pub const MEMORY_USED_BYTES: &str = "worker_memory_used_bytes";
    pub const IS_PROCESSING: &str = "worker_is_processing";
    pub const CONCURRENCY_ACTIVE: &str = "worker_concurrency_active";
    pub const CONCURRENCY_LIMIT: &str = "worker_concurrency_limit";
    pub const CONCURRENCY_AVAILABLE: &str = "worker_concurrency_available";
}

/// Snapshot of the loop's current state, used both for `/health` JSON and to
/// populate the gauges `/metrics` renders (§4.H).
#[derive(Debug, Clone, Copy)]
pub struct WorkerSnapshot {
    pub uptime_seconds: u64,
    pub last_heartbeat_seconds_ago: u64,
    pub memory_used_bytes: u64,
    pub is_processing: bool,
    pub concurrency_active: i64,
    pub concurrency_limit: i64,
}

pub fn record_snapshot(snapshot: &WorkerSnapshot) {
    gauge!(names::UPTIME_SECONDS).set(snapshot.uptime_seconds as f64);
    gauge!(names::LAST_HEARTBEAT_SECONDS).set(snapshot.last_heartbeat_seconds_ago as f64);
    gauge!(names::MEMORY_USED_BYTES).set(snapshot.memory_used_bytes as f64);
    gauge!(names::IS_PROCESSING).set(if snapshot.is_processing { 1.0 } else { 0.0 });
    gauge!(names::CONCURRENCY_ACTIVE).set(snapshot.concurrency_active as f64);
    gauge!(names::CONCURRENCY_LIMIT).set(snapshot.concurrency_limit as f64);
    gauge!(names::CONCURRENCY_AVAILABLE)
        .set((snapshot.concurrency_limit - snapshot.concurrency_active).max(0) as f64);
}
