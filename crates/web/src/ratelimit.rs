//! Job-wide rate limiting
//!
//! Token bucket shared by every fetch in a job. Remote APIs typically
//! budget by account rather than by endpoint, so a single bucket spans all
//! workers and all timeseries chunks; per-worker buckets would overshoot
//! the account quota during fan-out.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Token bucket state for the shared limiter
#[derive(Debug)]
struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(max_tokens: u32) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
        }
    }

    /// Try to consume a token, returns true if allowed
    fn try_consume(&mut self, max_tokens: u32, window: Duration) -> bool {
        // Refill tokens based on time elapsed
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);

        if elapsed >= window {
            // Full refill
            self.tokens = max_tokens;
            self.last_refill = now;
        } else {
            // Partial refill based on elapsed time
            let refill_rate = f64::from(max_tokens) / window.as_secs_f64();
            let refill_amount = (elapsed.as_secs_f64() * refill_rate) as u32;

            if refill_amount > 0 {
                self.tokens = (self.tokens + refill_amount).min(max_tokens);
                self.last_refill = now;
            }
        }

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }
}

/// Shared token-bucket rate limiter
///
/// Allows `burst` acquisitions per `period`, refilling continuously at
/// `burst / period` tokens per second. One instance is created per job and
/// shared across every worker through an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    burst: u32,
    period: Duration,
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Panics
    ///
    /// Panics if `burst` is zero or `period` is zero; callers validate the
    /// configuration before constructing the limiter.
    pub fn new(burst: u32, period: Duration) -> Self {
        assert!(burst > 0, "rate limiter burst must be positive");
        assert!(!period.is_zero(), "rate limiter period must be positive");
        Self {
            burst,
            period,
            bucket: Mutex::new(TokenBucket::new(burst)),
        }
    }

    /// Wait until a token is available and consume it
    ///
    /// Callers that need cancellation race this future against their cancel
    /// signal; dropping the future releases nothing (the token is only
    /// consumed on success).
    pub async fn acquire(&self) {
        loop {
            {
                let mut bucket = self.bucket.lock().await;
                if bucket.try_consume(self.burst, self.period) {
                    return;
                }
            }
            // One token becomes available every period / burst.
            tokio::time::sleep(self.refill_interval()).await;
        }
    }

    /// Consume a token without waiting, returns true if one was available
    pub async fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().await;
        bucket.try_consume(self.burst, self.period)
    }

    /// Time between single-token refills
    fn refill_interval(&self) -> Duration {
        self.period / self.burst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_burst_immediately() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        for _ in 0..10 {
            assert!(limiter.try_acquire().await);
        }
    }

    #[tokio::test]
    async fn blocks_excess() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(limiter.try_acquire().await);
        }
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test]
    async fn acquire_waits_for_refill() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));
        let start = Instant::now();

        // Two tokens immediately, the third must wait for a refill.
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn bounded_call_rate() {
        // With burst B over period P, N acquisitions take at least
        // (N - B) * P / B.
        let limiter = RateLimiter::new(2, Duration::from_millis(100));
        let start = Instant::now();
        for _ in 0..6 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
