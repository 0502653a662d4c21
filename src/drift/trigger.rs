use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::FieldSelector;
use super::ProcessShutdown;
use super::Shutdown;
use super::ShutdownReason;
use super::Verdict;
use crate::metrics::DRIFT_DETECTED;
use crate::metrics::ERROR_EVENTS;
use crate::Backoff;
use crate::ChangeEvent;
use crate::RetryPolicy;
use crate::Sleeper;
use crate::TokioSleeper;
use crate::WatchSessionManager;
use crate::WatchSource;
use crate::WatchTarget;

/// How [`RestartTrigger::run`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The shutdown hook was invoked and returned
    Shutdown(ShutdownReason),
    /// The cancellation token fired; no shutdown was requested
    Cancelled,
}

/// Watches one resource and shuts the process down when the tracked field
/// drifts from its baseline.
pub struct RestartTrigger<S, Z = TokioSleeper, D = ProcessShutdown>
where
    S: WatchSource,
    Z: Sleeper,
    D: Shutdown,
{
    manager: WatchSessionManager<S, Z>,
    shutdown: D,
}

impl<S, Z, D> RestartTrigger<S, Z, D>
where
    S: WatchSource,
    Z: Sleeper,
    D: Shutdown,
{
    pub fn new(
        manager: WatchSessionManager<S, Z>,
        shutdown: D,
    ) -> Self {
        Self { manager, shutdown }
    }

    pub fn manager(&self) -> &WatchSessionManager<S, Z> {
        &self.manager
    }

    /// Runs until drift is detected, the watch cannot be re-established or
    /// `cancel` fires.
    ///
    /// A stream closed by the remote side is resubscribed after a pause. The
    /// pause starts at `policy.initial_delay()` and grows with the policy's
    /// factor while streams keep closing without delivering an event; the
    /// first delivered event resets it. With [`ProcessShutdown`] this only
    /// returns on cancellation.
    pub async fn run(
        &self,
        target: &WatchTarget,
        selector: &FieldSelector,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> RunOutcome {
        debug!(field = selector.field(), baseline = selector.baseline(), "watch for changes");

        let pacing = RetryPolicy {
            max_attempts: 0,
            ..policy
        };
        let mut resubscribe = Backoff::new(pacing);

        loop {
            let mut session = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(resource = %target, "watch cancelled before subscription");
                    return RunOutcome::Cancelled;
                }
                result = self.manager.start_watch(target, policy) => match result {
                    Ok(session) => session,
                    Err(e) => {
                        error!(resource = %target, attempts = e.attempts(), fatal = true, error = %e, "cannot create watcher");
                        return self.terminate(ShutdownReason::connection_failed(target, &e));
                    }
                }
            };

            let mut delivered = false;
            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(resource = %target, "watch cancelled");
                        return RunOutcome::Cancelled;
                    }
                    event = session.next_event() => event,
                };

                let Some(event) = event else {
                    break;
                };
                if !delivered {
                    delivered = true;
                    resubscribe = Backoff::new(pacing);
                }

                match selector.evaluate(&event) {
                    Verdict::Drifted { current, new } => {
                        info!(
                            field = selector.field(),
                            current = %current,
                            new = %new,
                            "restarting to apply updated configuration"
                        );
                        DRIFT_DETECTED.inc();
                        drop(session);

                        return self.terminate(ShutdownReason::Drift {
                            field: selector.field().to_string(),
                            baseline: current,
                            current: new,
                        });
                    }
                    Verdict::Ignored => {
                        if let ChangeEvent::Error(detail) = &event {
                            ERROR_EVENTS.with_label_values(&[detail.code.as_str()]).inc();
                            debug!(resource = %target, code = %detail.code, message = %detail.message, "watch reported error");
                        } else {
                            trace!(resource = %target, kind = event.kind(), "event ignored");
                        }
                    }
                    Verdict::Absent => {
                        trace!(resource = %target, field = selector.field(), "tracked field absent");
                    }
                    Verdict::Unchanged => {
                        trace!(resource = %target, version = ?event.resource_version(), "tracked field unchanged");
                    }
                }
            }

            drop(session);
            let delay = resubscribe.next_delay().unwrap_or(pacing.initial_delay());
            warn!(resource = %target, delivered, ?delay, "watch stream closed by server, resubscribing");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(resource = %target, "watch cancelled while waiting to resubscribe");
                    return RunOutcome::Cancelled;
                }
                _ = self.manager.sleeper().sleep(delay) => {}
            }
        }
    }

    fn terminate(
        &self,
        reason: ShutdownReason,
    ) -> RunOutcome {
        self.shutdown.shutdown(&reason);
        RunOutcome::Shutdown(reason)
    }
}
