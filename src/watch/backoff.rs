//! Retry state machine for establishing a watch subscription.
//!
//! [`Backoff`] only counts attempts and computes delays; it never sleeps.
//! Waiting goes through [`Sleeper`] so tests can drive the retry loop without
//! real time.

use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tokio::time::sleep;
use tokio::time::timeout;
use tonic::async_trait;
use tracing::debug;
use tracing::warn;

use super::WatchTarget;
use crate::RetryPolicy;
use crate::WatchError;

/// Suspends the retry loop between subscribe attempts
#[async_trait]
pub trait Sleeper: Send + Sync + 'static {
    async fn sleep(
        &self,
        duration: Duration,
    );
}

/// [`Sleeper`] backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(
        &self,
        duration: Duration,
    ) {
        sleep(duration).await;
    }
}

/// Attempt counter and delay generator for one `start_watch` call
///
/// Each failed attempt is reported through [`Backoff::next_delay`], which
/// either yields the delay before the next attempt or `None` once the attempt
/// budget is spent.
#[derive(Debug)]
pub struct Backoff<R = StdRng> {
    policy: RetryPolicy,
    failed_attempts: usize,
    last_delay: Option<Duration>,
    rng: R,
}

impl Backoff<StdRng> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_entropy())
    }
}

impl<R: Rng> Backoff<R> {
    pub fn with_rng(
        policy: RetryPolicy,
        rng: R,
    ) -> Self {
        Self {
            policy,
            failed_attempts: 0,
            last_delay: None,
            rng,
        }
    }

    /// Number of attempts reported as failed so far
    pub fn failed_attempts(&self) -> usize {
        self.failed_attempts
    }

    /// Delay chosen for the previous retry, if any
    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    /// Records a failed attempt and returns how long to wait before the next
    /// one, or `None` when no attempt is left.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.failed_attempts += 1;
        if !self.policy.is_unbounded() && self.failed_attempts >= self.policy.max_attempts {
            return None;
        }

        let cap = self.policy.max_delay();
        let base_nanos = match self.last_delay {
            None => self.policy.initial_delay().as_nanos() as f64,
            Some(prev) => prev.as_nanos() as f64 * self.policy.factor,
        };

        let spread = if self.policy.jitter > 0.0 {
            self.rng.gen_range(-self.policy.jitter..=self.policy.jitter)
        } else {
            0.0
        };

        let nanos = (base_nanos * (1.0 + spread)).round();
        let delay = if !nanos.is_finite() || nanos >= cap.as_nanos() as f64 {
            cap
        } else {
            Duration::from_nanos(nanos as u64)
        };

        self.last_delay = Some(delay);
        Some(delay)
    }
}

/// Runs `op` against `target` until it succeeds or `policy` gives up.
///
/// Each attempt is bounded by `policy.timeout()`; failed attempts are
/// separated by [`Backoff`] delays taken through `sleeper`.
///
/// # Errors
/// [`WatchError::Connection`] once the attempt budget is spent, carrying the
/// last underlying cause.
pub async fn retry_with_backoff<T, F, Fut, Z>(
    target: &WatchTarget,
    policy: RetryPolicy,
    sleeper: &Z,
    mut op: F,
) -> std::result::Result<T, WatchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, WatchError>>,
    Z: Sleeper,
{
    let mut backoff = Backoff::new(policy);
    let mut attempt = 1;

    loop {
        let outcome = match timeout(policy.timeout(), op()).await {
            Ok(result) => result,
            Err(_) => Err(WatchError::Timeout(policy.timeout())),
        };

        let e = match outcome {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        debug!(resource = %target, attempt, error = %e, "attempt failed");

        match backoff.next_delay() {
            Some(delay) => {
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            None => {
                warn!(resource = %target, attempts = attempt, "retry budget exhausted");
                return Err(WatchError::Connection {
                    target: target.clone(),
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
        }
    }
}
