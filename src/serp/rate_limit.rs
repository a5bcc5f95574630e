// Request pacing and retry for the search API.
//
// The limiter enforces a minimum interval between requests across all
// workers. `with_retry` re-runs a request on transient failures (timeouts,
// transport errors, 429, 5xx) with exponential backoff and jitter. Permanent
// failures are returned on the first attempt.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::warn;

use crate::error::FetchError;

/// Minimum-interval rate limiter shared by every worker in a run.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Option<Arc<Mutex<RateLimiterInner>>>,
}

struct RateLimiterInner {
    interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Create a rate limiter that allows `requests_per_second` requests per second.
    ///
    /// A rate whose interval does not fit in a `Duration` is treated as unlimited.
    pub fn new(requests_per_second: f64) -> Self {
        let Ok(interval) = Duration::try_from_secs_f64(1.0 / requests_per_second) else {
            warn!(qps = requests_per_second, "Unusable request rate, not rate limiting");
            return Self::unlimited();
        };
        Self {
            inner: Some(Arc::new(Mutex::new(RateLimiterInner {
                interval,
                last_request: None,
            }))),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self { inner: None }
    }

    /// Build from an optional QPS setting; `None` or a non-positive value means unlimited.
    pub fn from_qps(max_qps: Option<f64>) -> Self {
        match max_qps {
            Some(qps) if qps > 0.0 => Self::new(qps),
            _ => Self::unlimited(),
        }
    }

    /// Wait until a request is allowed, then return.
    pub async fn acquire(&self) {
        let Some(inner) = &self.inner else {
            return;
        };

        // Reserve the next slot while holding the lock, sleep after releasing it
        let wait = {
            let mut state = inner.lock().await;
            let now = Instant::now();
            let slot = match state.last_request {
                Some(last) if now.duration_since(last) < state.interval => last + state.interval,
                _ => now,
            };
            state.last_request = Some(slot);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// How many times, and how patiently, to retry a transient failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based): base * 2^(attempt-1),
    /// capped, plus up to 25% jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff);

        // Nanosecond component of the clock is enough spread to avoid
        // workers retrying in lockstep
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        let jitter_fraction = (nanos % 250) as f64 / 1000.0;
        backoff + backoff.mul_f64(jitter_fraction)
    }
}

/// Run `operation`, retrying transient failures according to `policy`.
///
/// The limiter is acquired before every attempt, retries included.
pub async fn with_retry<F, Fut, T>(
    rate_limiter: &RateLimiter,
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, FetchError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        rate_limiter.acquire().await;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= policy.max_retries {
                    return Err(err);
                }

                attempt += 1;
                let delay = policy.backoff(attempt);
                warn!(
                    attempt = attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient search failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
