//! Retry policy for rate-limited backend calls.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff with jitter.
///
/// Wait before retry `n` (0-based) is `base_delay * 2^n + jitter` with
/// jitter drawn uniformly from `[0, base_delay)`, so consecutive waits
/// strictly increase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Whether another attempt is allowed after `attempts` have failed
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Deterministic part of the wait before retry `retry`
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Full wait before retry `retry`, jitter included
    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff(retry) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        if base_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..base_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert!(policy.should_retry(4));
        assert!(!policy.should_retry(5));
    }

    #[test]
    fn test_waits_strictly_increase() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        for _ in 0..50 {
            let waits: Vec<_> = (0..4).map(|n| policy.delay(n)).collect();
            for (n, wait) in waits.iter().enumerate() {
                let floor = policy.backoff(n as u32);
                assert!(*wait >= floor && *wait < floor + policy.base_delay);
            }
            assert!(waits.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_zero_base_has_no_jitter() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert_eq!(policy.delay(2), Duration::ZERO);
    }

    #[test]
    fn test_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts, 1);
    }
}
