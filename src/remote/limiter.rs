//! Sliding-window request admission.
//!
//! The limiter records the timestamp of every admitted call and admits a
//! new one only while fewer than `limit` timestamps fall inside the
//! rolling window. When the window is full it sleeps `retry_delay` and
//! re-evaluates, so bursts that pile up during the wait still queue behind
//! the limit instead of stampeding through. There is deliberately no upper
//! bound on the wait: a caller retries until a slot frees.

use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Process-wide admission controller for outbound remote calls.
///
/// Check-and-record is atomic: the window lives behind a mutex, so
/// concurrent group tasks cannot oversubscribe the limit between the
/// count check and the append.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    period: Duration,
    retry_delay: Duration,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Build a limiter from the configured rate settings.
    ///
    /// A zero request count would never admit anything; it is clamped to 1.
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            limit: config.requests.max(1),
            period: Duration::from_millis(config.period_ms),
            retry_delay: Duration::from_millis(config.retry_ms),
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request slot is free, then claim it.
    ///
    /// Prunes timestamps older than the window period, admits immediately
    /// when a slot remains, otherwise sleeps and re-checks.
    pub async fn admit(&self) {
        loop {
            {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                while window.front().is_some_and(|&t| t + self.period <= now) {
                    window.pop_front();
                }
                if window.len() < self.limit {
                    window.push_back(now);
                    return;
                }
            }
            tracing::trace!(delay = ?self.retry_delay, "rate limit reached, waiting");
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(requests: usize, period_ms: u64, retry_ms: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            requests,
            period_ms,
            retry_ms,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_limit_without_waiting() {
        let limiter = limiter(3, 1000, 100);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.admit().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_limit_waits_for_window_to_slide() {
        let limiter = limiter(2, 1000, 100);
        let start = Instant::now();
        limiter.admit().await;
        limiter.admit().await;
        // third call must wait until the first timestamp ages out
        limiter.admit().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_frees_after_period() {
        let limiter = limiter(2, 1000, 100);
        limiter.admit().await;
        limiter.admit().await;
        tokio::time::sleep(Duration::from_millis(1100)).await;

        // both slots aged out, so no further wait
        let start = Instant::now();
        limiter.admit().await;
        limiter.admit().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_admissions_respect_limit() {
        let limiter = std::sync::Arc::new(limiter(2, 1000, 50));
        let start = Instant::now();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            tasks.spawn(async move {
                limiter.admit().await;
            });
        }
        while tasks.join_next().await.is_some() {}

        // four admissions at limit 2 need at least one full window
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_is_clamped() {
        let limiter = limiter(0, 1000, 100);
        let start = Instant::now();
        limiter.admit().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
