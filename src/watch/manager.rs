use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use dashmap::DashSet;
use tokio::time::timeout;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ActiveSessionGuard;
use super::Backoff;
use super::SessionState;
use super::Sleeper;
use super::TokioSleeper;
use super::WatchSession;
use super::WatchSource;
use super::WatchTarget;
use crate::metrics::CONNECT_ATTEMPTS;
use crate::metrics::SESSIONS_OPENED;
use crate::RetryPolicy;
use crate::WatchError;

/// Opens watch sessions against a [`WatchSource`]
///
/// Holds the two pieces of state shared across sessions:
/// - the set of targets with a live session (at most one per target)
/// - the last resource version seen per target, sent on resubscription
pub struct WatchSessionManager<S, Z = TokioSleeper>
where
    S: WatchSource,
    Z: Sleeper,
{
    source: Arc<S>,
    sleeper: Z,
    event_buffer_size: usize,
    active: Arc<DashSet<WatchTarget>>,
    bookmarks: DashMap<WatchTarget, Arc<ArcSwapOption<String>>>,
}

impl<S: WatchSource> WatchSessionManager<S, TokioSleeper> {
    pub fn new(
        source: S,
        event_buffer_size: usize,
    ) -> Self {
        Self::with_sleeper(source, TokioSleeper, event_buffer_size)
    }
}

impl<S, Z> WatchSessionManager<S, Z>
where
    S: WatchSource,
    Z: Sleeper,
{
    pub fn with_sleeper(
        source: S,
        sleeper: Z,
        event_buffer_size: usize,
    ) -> Self {
        Self {
            source: Arc::new(source),
            sleeper,
            event_buffer_size,
            active: Arc::new(DashSet::new()),
            bookmarks: DashMap::new(),
        }
    }

    /// Establishes a watch session for `target`.
    ///
    /// Failed subscribe attempts are retried according to `policy`. Each
    /// attempt is bounded by `policy.timeout_ms`.
    ///
    /// # Errors
    /// - [`WatchError::SessionActive`] if a session for `target` is still alive
    /// - [`WatchError::Connection`] once the attempt budget is spent, carrying
    ///   the last underlying cause
    pub async fn start_watch(
        &self,
        target: &WatchTarget,
        policy: RetryPolicy,
    ) -> std::result::Result<WatchSession, WatchError> {
        let guard = ActiveSessionGuard::acquire(target, &self.active)
            .ok_or_else(|| WatchError::SessionActive(target.clone()))?;

        info!(namespace = %target.namespace, name = %target.name, "Starting watcher");

        let bookmark = self.bookmark(target);
        let mut backoff = Backoff::new(policy);
        let mut attempt = 1;

        loop {
            let state = SessionState::Connecting { attempt };
            let resume_from = bookmark.load_full().map(|v| v.as_ref().clone());
            debug!(resource = %target, ?state, ?resume_from, "subscribing");

            let outcome = match timeout(policy.timeout(), self.source.subscribe(target, resume_from)).await {
                Ok(result) => result,
                Err(_) => Err(WatchError::Timeout(policy.timeout())),
            };

            match outcome {
                Ok(stream) => {
                    CONNECT_ATTEMPTS.with_label_values(&["success"]).inc();
                    SESSIONS_OPENED.inc();
                    debug!(resource = %target, attempt, "watch stream established");
                    return Ok(WatchSession::spawn(
                        target.clone(),
                        stream,
                        bookmark,
                        self.event_buffer_size,
                        guard,
                    ));
                }
                Err(e) => {
                    CONNECT_ATTEMPTS.with_label_values(&["failure"]).inc();
                    debug!(resource = %target, attempt, retriable = true, error = %e, "cannot create watcher");

                    match backoff.next_delay() {
                        Some(delay) => {
                            debug!(resource = %target, ?delay, "retrying subscription");
                            self.sleeper.sleep(delay).await;
                            attempt += 1;
                        }
                        None => {
                            warn!(resource = %target, attempts = attempt, "watch retry budget exhausted");
                            return Err(WatchError::Connection {
                                target: target.clone(),
                                attempts: attempt,
                                source: Box::new(e),
                            });
                        }
                    }
                }
            }
        }
    }

    /// The [`Sleeper`] used between attempts; callers pacing resubscription
    /// share it.
    pub fn sleeper(&self) -> &Z {
        &self.sleeper
    }

    /// Whether a session for `target` is currently alive
    pub fn is_active(
        &self,
        target: &WatchTarget,
    ) -> bool {
        self.active.contains(target)
    }

    /// Last resource version observed for `target`
    pub fn resume_version(
        &self,
        target: &WatchTarget,
    ) -> Option<String> {
        self.bookmarks
            .get(target)
            .and_then(|b| b.load_full())
            .map(|v| v.as_ref().clone())
    }

    fn bookmark(
        &self,
        target: &WatchTarget,
    ) -> Arc<ArcSwapOption<String>> {
        Arc::clone(
            self.bookmarks
                .entry(target.clone())
                .or_insert_with(|| Arc::new(ArcSwapOption::empty()))
                .value(),
        )
    }
}
