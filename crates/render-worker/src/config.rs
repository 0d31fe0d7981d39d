//! Worker runtime configuration (§4.H, §4.I, §6 env vars).

use std::time::Duration;

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Main loop tick (§4.H, default 2000).
    pub poll_interval_ms: u64,
    /// Semaphore size; refreshed from `system_settings` every `config_refresh_ms` (§4.H).
    pub max_concurrent_jobs: i64,
    /// `/health` fails once `now - lastHeartbeat` exceeds this (§4.H, default 60_000).
    pub heartbeat_timeout_ms: u64,
    /// How often `max_concurrent_jobs` is refreshed from settings (§4.H, default 15_000).
    pub config_refresh_ms: u64,
    pub rescue_stuck_renders: bool,
    /// T_stuck for the rescue sweep (§4.A, default 600_000 = 10 min).
    pub render_stuck_timeout_ms: i64,
    /// Rescue sweep cadence (§4.H, default 60_000).
    pub render_stuck_sweep_interval_ms: u64,
    pub cleanup_enabled: bool,
    pub failed_render_retention_days: i64,
    pub success_render_retention_hours: i64,
    pub cleanup_max_age_days: i64,
    pub health_port: u16,
    pub work_dir: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            max_concurrent_jobs: 2,
            heartbeat_timeout_ms: 60_000,
            config_refresh_ms: 15_000,
            rescue_stuck_renders: true,
            render_stuck_timeout_ms: 600_000,
            render_stuck_sweep_interval_ms: 60_000,
            cleanup_enabled: true,
            failed_render_retention_days: 7,
            success_render_retention_hours: 1,
            cleanup_max_age_days: 30,
            health_port: 3001,
            work_dir: "/tmp/render-worker".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval_ms: env_u64("WORKER_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            max_concurrent_jobs: env_i64("MAX_CONCURRENT_JOBS", defaults.max_concurrent_jobs),
            heartbeat_timeout_ms: env_u64("HEARTBEAT_TIMEOUT_MS", defaults.heartbeat_timeout_ms),
            config_refresh_ms: env_u64("WORKER_CONFIG_REFRESH_MS", defaults.config_refresh_ms),
            rescue_stuck_renders: env_bool("RESCUE_STUCK_RENDERS", defaults.rescue_stuck_renders),
            render_stuck_timeout_ms: env_i64("RENDER_STUCK_TIMEOUT_MS", defaults.render_stuck_timeout_ms),
            render_stuck_sweep_interval_ms: env_u64(
                "RENDER_STUCK_SWEEP_INTERVAL_MS",
                defaults.render_stuck_sweep_interval_ms,
            ),
            cleanup_enabled: env_bool("CLEANUP_ENABLED", defaults.cleanup_enabled),
            failed_render_retention_days: env_i64(
                "FAILED_RENDER_RETENTION_DAYS",
                defaults.failed_render_retention_days,
            ),
            success_render_retention_hours: env_i64(
                "SUCCESS_RENDER_RETENTION_HOURS",
                defaults.success_render_retention_hours,
            ),
            cleanup_max_age_days: env_i64("CLEANUP_MAX_AGE_DAYS", defaults.cleanup_max_age_days),
            health_port: env_u64("HEALTH_PORT", defaults.health_port as u64) as u16,
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn config_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.config_refresh_ms)
    }

    pub fn render_stuck_timeout(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.render_stuck_timeout_ms)
    }

    pub fn render_stuck_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.render_stuck_sweep_interval_ms)
    }
}
