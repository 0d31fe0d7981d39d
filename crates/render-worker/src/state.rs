//! Process-local heartbeat/concurrency state shared between the main loop and
//! the HTTP health surface (§4.H).

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
pub struct WorkerState {
    started_at: Instant,
    last_heartbeat_unix_ms: AtomicU64,
    is_shutting_down: AtomicBool,
    concurrency_limit: AtomicI64,
    concurrency_active: AtomicI64,
    current_job_summary: std::sync::Mutex<Option<String>>,
}

pub type SharedWorkerState = Arc<WorkerState>;

impl WorkerState {
    pub fn new(concurrency_limit: i64) -> SharedWorkerState {
        Arc::new(Self {
            started_at: Instant::now(),
            last_heartbeat_unix_ms: AtomicU64::new(now_unix_ms()),
            is_shutting_down: AtomicBool::new(false),
            concurrency_limit: AtomicI64::new(concurrency_limit),
            concurrency_active: AtomicI64::new(0),
            current_job_summary: std::sync::Mutex::new(None),
        })
    }

    pub fn bump_heartbeat(&self) {
        self.last_heartbeat_unix_ms.store(now_unix_ms(), Ordering::Relaxed);
    }

    pub fn last_heartbeat_age_ms(&self) -> u64 {
        now_unix_ms().saturating_sub(self.last_heartbeat_unix_ms.load(Ordering::Relaxed))
    }

    pub fn last_heartbeat_unix_ms(&self) -> u64 {
        self.last_heartbeat_unix_ms.load(Ordering::Relaxed)
    }

    pub fn set_shutting_down(&self) {
        self.is_shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::SeqCst)
    }

    pub fn set_concurrency_limit(&self, limit: i64) {
        self.concurrency_limit.store(limit, Ordering::Relaxed);
    }

    pub fn concurrency_limit(&self) -> i64 {
        self.concurrency_limit.load(Ordering::Relaxed)
    }

    pub fn job_started(&self, summary: impl Into<String>) {
        self.concurrency_active.fetch_add(1, Ordering::SeqCst);
        *self.current_job_summary.lock().unwrap() = Some(summary.into());
    }

    pub fn job_finished(&self) {
        self.concurrency_active.fetch_sub(1, Ordering::SeqCst);
        if self.concurrency_active.load(Ordering::SeqCst) <= 0 {
            *self.current_job_summary.lock().unwrap() = None;
        }
    }

    pub fn concurrency_active(&self) -> i64 {
        self.concurrency_active.load(Ordering::SeqCst)
    }

    pub fn current_job_summary(&self) -> Option<String> {
        self.current_job_summary.lock().unwrap().clone()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

fn now_unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Approximate resident memory usage by reading `/proc/self/statm`, falling back
/// to 0 on platforms where it's unavailable.
pub fn memory_used_bytes() -> u64 {
    let Ok(contents) = std::fs::read_to_string("/proc/self/statm") else {
        return 0;
    };
    let page_size = 4096u64;
    contents
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .map(|resident_pages| resident_pages * page_size)
        .unwrap_or(0)
}
