//! Rate limit configuration
//!
//! The job-wide request budget: at most `burst` requests per `period`,
//! enforced by a single token bucket shared across every fetch in the job.
//! Both fields are optional at parse time so the pipeline can fail closed
//! with a precise error naming the missing field.

use std::time::Duration;

use serde::Deserialize;

/// Job-wide rate limit budget.
///
/// # Example
///
/// ```toml
/// [rateLimit]
/// burst = 10
/// period = "1s"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per period.
    pub burst: Option<u32>,

    /// Refill period (humantime string, e.g. "1s" or "500ms").
    #[serde(with = "humantime_serde")]
    pub period: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_humantime_period() {
        let rl: RateLimitConfig = toml::from_str("burst = 10\nperiod = \"1s\"").unwrap();
        assert_eq!(rl.burst, Some(10));
        assert_eq!(rl.period, Some(Duration::from_secs(1)));
    }

    #[test]
    fn fields_default_to_none() {
        let rl: RateLimitConfig = toml::from_str("").unwrap();
        assert!(rl.burst.is_none());
        assert!(rl.period.is_none());
    }
}
