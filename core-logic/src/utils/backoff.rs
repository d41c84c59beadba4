use crate::config::SpamTimings;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff schedule: `base * exponential_base^attempt`, capped at
/// `max_delay_ms`, optionally jittered by ±50%.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            exponential_base: 2.0,
            jitter: false,
        }
    }
}

impl BackoffConfig {
    pub fn new(base_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms: base_delay_ms * 30,
            ..Default::default()
        }
    }

    /// Delay used after unexpected errors; a factor of 1.0 keeps it fixed.
    pub fn for_unexpected(timings: &SpamTimings) -> Self {
        Self {
            base_delay_ms: timings.unexpected_error_ms,
            max_delay_ms: timings.unexpected_max_ms,
            exponential_base: timings.unexpected_backoff_factor,
            jitter: false,
        }
    }

    pub fn with_max_delay(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = self.base_delay_ms as f64 * self.exponential_base.powi(exponent);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        let delay_ms = if self.jitter {
            let rng_factor = rand::thread_rng().gen_range(0.5..=1.5);
            delay_ms * rng_factor
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}
