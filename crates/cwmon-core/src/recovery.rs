//! Reconnect backoff for long-lived push streams.
//!
//! Stream transport failures are never escalated; they are retried forever
//! with a delay that doubles per consecutive failure up to a cap. A delivered
//! message resets the sequence.
//!
//! ## Example
//!
//! ```
//! use cwmon_core::recovery::{Backoff, BackoffConfig};
//! use std::time::Duration;
//!
//! let mut backoff = Backoff::new(BackoffConfig::default());
//! assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
//! assert_eq!(backoff.next_delay(), Duration::from_millis(2000));
//! backoff.reset();
//! assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
//! ```

use std::time::Duration;

/// Default delay before the first reconnect attempt.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

/// Default upper bound for the reconnect delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 15_000;

/// Configuration for reconnect backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first retry after a failure.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth).
    pub max_delay: Duration,
    /// Growth factor per consecutive failure.
    pub multiplier: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            multiplier: 2,
        }
    }
}

impl BackoffConfig {
    /// Build a doubling config from millisecond bounds.
    pub fn from_millis(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_millis(max_ms.max(initial_ms)),
            multiplier: 2,
        }
    }

    /// Delay for the n-th consecutive retry (0-based): `min(initial * m^n, max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_delay;
        for _ in 0..attempt {
            if delay >= self.max_delay || delay.is_zero() || self.multiplier <= 1 {
                break;
            }
            delay = delay.saturating_mul(self.multiplier);
        }
        delay.min(self.max_delay)
    }
}

/// Stateful backoff sequence for one stream.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    consecutive_failures: u32,
}

impl Backoff {
    /// Create a backoff sequence positioned at its initial delay.
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current();
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        delay
    }

    /// Return to the initial delay (called on every delivered message).
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    /// The delay the next failure will wait.
    pub fn current(&self) -> Duration {
        self.config.delay_for_attempt(self.consecutive_failures)
    }

    /// Number of failures since the last reset.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// The policy this sequence follows.
    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_and_caps() {
        let mut backoff = Backoff::default();
        let delays: Vec<u128> = (0..6).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 15000, 15000]);
        assert_eq!(backoff.consecutive_failures(), 6);
    }

    #[test]
    fn test_nth_delay_matches_formula() {
        let config = BackoffConfig::default();
        let mut backoff = Backoff::new(config);
        for n in 0..12u32 {
            let expected = (1000u64 * 2u64.pow(n)).min(15_000);
            assert_eq!(config.delay_for_attempt(n), Duration::from_millis(expected));
            assert_eq!(backoff.next_delay(), Duration::from_millis(expected), "attempt {n}");
        }
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut backoff = Backoff::default();
        backoff.next_delay();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::from_millis(8000));

        backoff.reset();
        assert_eq!(backoff.consecutive_failures(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_from_millis_never_inverts_bounds() {
        let config = BackoffConfig::from_millis(5000, 100);
        assert_eq!(config.max_delay, Duration::from_millis(5000));
        let mut backoff = Backoff::new(config);
        assert_eq!(backoff.next_delay(), Duration::from_millis(5000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(5000));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let config = BackoffConfig::default();
        assert_eq!(config.delay_for_attempt(u32::MAX), config.max_delay);
    }
}
