//! Exponential backoff policy for the inference retry loop.
//!
//! [`BackoffConfig`] controls how temporary failures (timeouts, connection
//! errors, 429, 5xx) are retried with increasing delays. The delay for an
//! attempt is a pure function of the attempt index, so the policy is
//! testable without sleeping.

use std::time::Duration;

/// Retry/backoff policy for the inference call.
///
/// The delay before retry *n* (0-indexed) is `base_delay * multiplier^n`,
/// capped at `max_delay`, with optional jitter on top.
///
/// # Example
///
/// ```
/// use llm_middleware::inference::BackoffConfig;
/// use std::time::Duration;
///
/// let standard = BackoffConfig::standard();
/// assert_eq!(standard.max_retries, 3);
/// assert_eq!(standard.delay_for_attempt(0), Duration::from_secs(1));
/// assert_eq!(standard.delay_for_attempt(2), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Multiplier applied per retry: base, base * multiplier, ...
    pub multiplier: f64,

    /// Upper bound on any single delay.
    pub max_delay: Duration,

    /// Jitter strategy. Default: none, so the documented formula holds.
    pub jitter: JitterStrategy,

    /// Whether to honor `Retry-After` response headers over the computed delay.
    pub respect_retry_after: bool,
}

/// Jitter applied on top of the computed delay, to spread out retries from
/// many concurrent invocations hitting a shared rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JitterStrategy {
    /// No jitter. Delay is exactly the computed value.
    #[default]
    None,

    /// Full jitter: random value in `[0, computed_delay]`.
    Full,

    /// Equal jitter: `computed_delay/2 + random in [0, computed_delay/2]`.
    Equal,
}

impl BackoffConfig {
    /// No retry at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::standard()
        }
    }

    /// Defaults matching the deployment this crate grew out of:
    /// 3 retries, 1 s base, doubling, 60 s cap, Retry-After honored.
    pub fn standard() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: JitterStrategy::None,
            respect_retry_after: true,
        }
    }

    /// Set the retry count.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the jitter strategy.
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jittered = match self.jitter {
            JitterStrategy::None => capped,
            JitterStrategy::Full => fastrand::f64() * capped,
            JitterStrategy::Equal => capped / 2.0 + fastrand::f64() * (capped / 2.0),
        };

        Duration::from_secs_f64(jittered)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_exponentially() {
        let config = BackoffConfig::standard();
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = BackoffConfig::standard()
            .with_base_delay(Duration::from_secs(1))
            .with_multiplier(2.0);
        // Attempt 10 would be 1024 s uncapped.
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(60));
    }

    #[test]
    fn test_fractional_multiplier() {
        let config = BackoffConfig::standard()
            .with_base_delay(Duration::from_millis(100))
            .with_multiplier(1.5);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(150));
    }

    #[test]
    fn test_full_jitter_stays_in_range() {
        let config = BackoffConfig::standard().with_jitter(JitterStrategy::Full);
        for _ in 0..100 {
            assert!(config.delay_for_attempt(1) <= Duration::from_secs(2));
        }
    }

    #[test]
    fn test_equal_jitter_lower_bound() {
        let config = BackoffConfig::standard().with_jitter(JitterStrategy::Equal);
        for _ in 0..100 {
            let d = config.delay_for_attempt(1);
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(2));
        }
    }

    #[test]
    fn test_none_preset() {
        assert_eq!(BackoffConfig::none().max_retries, 0);
    }
}
