use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Bounded exponential backoff for establishing a watch subscription
///
/// The delay before retry `n + 1` is the previous delay multiplied by
/// `factor`, randomized by `±jitter` and capped at `max_delay_ms`. The first
/// delay is `initial_delay_ms` randomized the same way.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of subscribe attempts (0 means unlimited attempts)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Single subscribe attempt timeout (unit: milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Multiplier applied to the previous delay
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Random fraction added to or removed from each delay, in `[0, 1)`
    #[serde(default = "default_jitter")]
    pub jitter: f64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            timeout_ms: default_timeout_ms(),
            initial_delay_ms: default_initial_delay_ms(),
            factor: default_factor(),
            jitter: default_jitter(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.initial_delay_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "retry initial_delay_ms must be greater than 0".into(),
            )));
        }

        if self.max_delay_ms < self.initial_delay_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "retry max_delay_ms ({}) must be >= initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            ))));
        }

        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "retry factor must be a finite value >= 1.0, got {}",
                self.factor
            ))));
        }

        if !(0.0..1.0).contains(&self.jitter) {
            return Err(Error::Config(ConfigError::Message(format!(
                "retry jitter must be within [0, 1), got {}",
                self.jitter
            ))));
        }

        if self.timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "retry timeout_ms must be greater than 0".into(),
            )));
        }

        Ok(())
    }

    /// Whether the attempt budget is unbounded
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts == 0
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_max_attempts() -> usize {
    10
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_initial_delay_ms() -> u64 {
    10_000
}
fn default_factor() -> f64 {
    2.0
}
fn default_jitter() -> f64 {
    0.1
}
// 2 hours
fn default_max_delay_ms() -> u64 {
    7_200_000
}
