//! Rate Limiter
//!
//! Process-wide minimum spacing between outbound geocoding calls.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Minimum time between the starts of two outbound calls
    pub min_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            // Nominatim allows 1 req/s; keep a small margin
            min_interval: Duration::from_millis(1100),
        }
    }
}

/// Minimum-interval rate limiter.
///
/// Callers reserve the next free slot under a short lock and then sleep
/// outside it, so concurrent callers line up one interval apart instead
/// of all waking at the same instant. A caller cancelled mid-wait keeps
/// its slot, so cancellation never frees burst capacity.
pub struct RateLimiter {
    config: RateLimitConfig,
    /// Start of the most recently reserved call
    last_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            last_start: Mutex::new(None),
        }
    }

    /// Shorthand for a limiter with the given interval.
    pub fn with_interval(min_interval: Duration) -> Self {
        Self::new(RateLimitConfig { min_interval })
    }

    pub fn min_interval(&self) -> Duration {
        self.config.min_interval
    }

    /// Wait until this caller may issue its call, then return.
    ///
    /// The wait is a suspension point: other tasks keep running.
    pub async fn await_turn(&self) {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            tracing::debug!("rate limiting geocoding call for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Reserve the next slot and return how long to wait for it.
    fn reserve(&self, now: Instant) -> Duration {
        let mut last = self.last_start.lock();
        let start = match *last {
            Some(prev) => (prev + self.config.min_interval).max(now),
            None => now,
        };
        *last = Some(start);
        start - now
    }

    /// Start instant of the most recently reserved call.
    pub fn last_start(&self) -> Option<Instant> {
        *self.last_start.lock()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_rate_limit_config_default() {
        let config = RateLimitConfig::default();
        assert_eq!(config.min_interval, Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_does_not_wait() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        limiter.await_turn().await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.last_start(), Some(start));
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_calls_wait_full_interval() {
        let limiter = RateLimiter::with_interval(Duration::from_millis(1100));
        let start = Instant::now();

        limiter.await_turn().await;
        limiter.await_turn().await;
        limiter.await_turn().await;

        assert!(start.elapsed() >= Duration::from_millis(2200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_elapsed() {
        let limiter = RateLimiter::with_interval(Duration::from_millis(500));

        limiter.await_turn().await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        let before = Instant::now();
        limiter.await_turn().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced() {
        let limiter = Arc::new(RateLimiter::with_interval(Duration::from_millis(1100)));
        let mut handles = vec![];

        for _ in 0..5 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.await_turn().await;
                Instant::now()
            }));
        }

        let mut starts = vec![];
        for h in handles {
            starts.push(h.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(
                pair[1] - pair[0] >= Duration::from_millis(1100),
                "calls only {:?} apart",
                pair[1] - pair[0]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_keeps_reservation() {
        let limiter = Arc::new(RateLimiter::with_interval(Duration::from_secs(1)));
        let start = Instant::now();

        limiter.await_turn().await;

        // Second caller gives up while waiting
        let waiting = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.await_turn().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        waiting.abort();
        let _ = waiting.await;

        // Third caller still queues behind the abandoned slot
        limiter.await_turn().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn test_reserve_zero_interval() {
        let limiter = RateLimiter::with_interval(Duration::ZERO);
        let now = Instant::now();
        assert_eq!(limiter.reserve(now), Duration::ZERO);
        assert_eq!(limiter.reserve(now), Duration::ZERO);
    }
}
