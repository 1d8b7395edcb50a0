//! Reconnect backoff
//!
//! Exponential delay with additive jitter, capped. The deterministic part
//! is monotonically non-decreasing across consecutive failures; jitter is
//! layered on top so a fleet of shards does not reconnect in lockstep.

use bot_common::ReconnectConfig;
use rand::Rng;
use std::time::Duration;

/// Exponential reconnect backoff with jitter
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl ReconnectBackoff {
    /// Create a backoff from the reconnect configuration
    #[must_use]
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_delay_ms),
            max: Duration::from_millis(config.max_delay_ms),
            attempt: 0,
        }
    }

    /// Deterministic delay for a given attempt number: `base * 2^attempt`,
    /// capped at the configured maximum
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt.min(16)).unwrap_or(u32::MAX);
        self.base.checked_mul(factor).map_or(self.max, |d| d.min(self.max))
    }

    /// Advance to the next attempt and return the delay to wait, jittered
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);

        // Up to 25% additive jitter, still respecting the cap
        let jitter_ms = delay.as_millis() as u64 / 4;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };

        (delay + jitter).min(self.max)
    }

    /// Reset after a stable connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> ReconnectBackoff {
        ReconnectBackoff::new(&ReconnectConfig {
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            max_attempts: 10,
            stability_window_secs: 30,
        })
    }

    #[test]
    fn test_delays_monotonically_non_decreasing_up_to_cap() {
        let backoff = backoff();
        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = backoff.delay_for_attempt(attempt);
            assert!(delay >= previous, "attempt {attempt} regressed");
            assert!(delay <= Duration::from_millis(60_000));
            previous = delay;
        }
    }

    #[test]
    fn test_caps_at_max() {
        let backoff = backoff();
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_millis(60_000));
    }

    #[test]
    fn test_jittered_delay_within_bounds() {
        let mut backoff = backoff();
        for _ in 0..5 {
            let attempt = backoff.attempt();
            let floor = backoff.delay_for_attempt(attempt);
            let delay = backoff.next_delay();
            assert!(delay >= floor);
            assert!(delay <= Duration::from_millis(60_000));
        }
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut backoff = backoff();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(1000));
    }
}
