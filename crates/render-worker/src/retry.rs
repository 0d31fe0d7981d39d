//! Retry-with-backoff, generalized from the teacher's job-retry helper for the
//! scene-recording and blob-transfer transient-error policies (§4.F Retries,
//! §7 "Transient I/O").

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Exponential backoff with jitter: base 2s, cap 32s, 0-25% jitter (§7).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
    pub operation_name: String,
}

impl RetryConfig {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(32),
            jitter_fraction: 0.25,
            operation_name: operation_name.into(),
        }
    }

    fn delay_for_attempt(&self, attempt: u32, jitter_roll: f64) -> Duration {
        let base = self.base_delay.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = base.min(self.max_delay);
        let jitter = 1.0 + jitter_roll * self.jitter_fraction;
        Duration::from_secs_f64(capped.as_secs_f64() * jitter)
    }
}

#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::Failed { error, .. } => Err(error),
        }
    }
}

/// Run `operation` with exponential backoff, retrying only errors for which
/// `is_retryable` returns true.
pub async fn retry_async<F, Fut, T, E>(
    config: &RetryConfig,
    is_retryable: impl Fn(&E) -> bool,
    operation: F,
) -> RetryResult<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) if attempt < config.max_retries && is_retryable(&e) => {
                attempt += 1;
                // No RNG dependency here; a cheap time-derived jitter roll is enough
                // to spread retries without needing a seeded generator.
                let jitter_roll = (std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.subsec_millis())
                    .unwrap_or(0) as f64)
                    / 1000.0;
                let delay = config.delay_for_attempt(attempt, jitter_roll);
                warn!(
                    operation = %config.operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                debug!(operation = %config.operation_name, attempts = attempt + 1, "retry budget exhausted");
                return RetryResult::Failed { error: e, attempts: attempt + 1 };
            }
        }
    }
}

/// Classifies a scene-recording error message as transient per §4.F/§7:
/// "navigation timeout, empty video, driver disconnect" / "timeout | navigation |
/// too many requests | 429".
pub fn is_transient_scene_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["timeout", "navigation", "too many requests", "429", "disconnect", "empty"]
        .iter()
        .any(|pat| lower.contains(pat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_navigation_timeouts_as_transient() {
        assert!(is_transient_scene_error("navigation timeout after 15000ms"));
    }

    #[test]
    fn recognizes_rate_limiting_as_transient() {
        assert!(is_transient_scene_error("received HTTP 429 too many requests"));
    }

    #[test]
    fn does_not_treat_arbitrary_errors_as_transient() {
        assert!(!is_transient_scene_error("invalid CSS selector"));
    }

    #[tokio::test]
    async fn stops_retrying_non_transient_errors_immediately() {
        let config = RetryConfig::new("test");
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result = retry_async(
            &config,
            |_: &&str| false,
            || {
                attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { Err::<(), &str>("permanent") }
            },
        )
        .await;
        assert!(matches!(result, RetryResult::Failed { attempts: 1, .. }));
    }
}
