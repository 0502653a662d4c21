use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use arc_swap::ArcSwapOption;
use dashmap::DashSet;
use futures::Stream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::ChangeEvent;
use super::EventStream;
use super::WatchTarget;
use crate::metrics::STREAMS_CLOSED;
use crate::metrics::WATCH_EVENTS;

/// Lifecycle of a watch subscription
///
/// ```text
/// Disconnected -> Connecting{attempt} -> Streaming -> Disconnected
///                   ^      |
///                   +------+ transient failure, within retry budget
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting { attempt: usize },
    Streaming,
}

/// Marks a target as having a live session; released on drop.
pub(crate) struct ActiveSessionGuard {
    target: WatchTarget,
    active: Arc<DashSet<WatchTarget>>,
}

impl ActiveSessionGuard {
    /// Claims `target`, or returns `None` if another session holds it.
    pub(crate) fn acquire(
        target: &WatchTarget,
        active: &Arc<DashSet<WatchTarget>>,
    ) -> Option<Self> {
        if !active.insert(target.clone()) {
            return None;
        }
        Some(Self {
            target: target.clone(),
            active: Arc::clone(active),
        })
    }
}

impl Drop for ActiveSessionGuard {
    fn drop(&mut self) {
        self.active.remove(&self.target);
        trace!(resource = %self.target, "watch session released");
    }
}

/// Live subscription for one [`WatchTarget`]
///
/// Owns the task that drains the underlying source. Events are exposed as a
/// [`Stream`] in transport order; the stream ends when the remote side closes
/// the subscription or fails irrecoverably. Dropping the session aborts the
/// task, which closes the source.
pub struct WatchSession {
    target: WatchTarget,
    receiver: mpsc::Receiver<ChangeEvent>,
    forwarder: JoinHandle<()>,
    _guard: ActiveSessionGuard,
}

impl WatchSession {
    pub(crate) fn spawn(
        target: WatchTarget,
        source: EventStream,
        bookmark: Arc<ArcSwapOption<String>>,
        buffer_size: usize,
        guard: ActiveSessionGuard,
    ) -> Self {
        let (tx, receiver) = mpsc::channel(buffer_size.max(1));
        let forwarder = tokio::spawn(forward_events(target.clone(), source, tx, bookmark));

        Self {
            target,
            receiver,
            forwarder,
            _guard: guard,
        }
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    /// `Streaming` until the source has ended, `Disconnected` afterwards.
    /// Buffered events may still be pending after the switch.
    pub fn state(&self) -> SessionState {
        if self.forwarder.is_finished() {
            SessionState::Disconnected
        } else {
            SessionState::Streaming
        }
    }

    /// Next event, or `None` once the stream is closed
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }
}

impl Stream for WatchSession {
    type Item = ChangeEvent;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.forwarder.abort();
        debug!(resource = %self.target, "watch session closed");
    }
}

async fn forward_events(
    target: WatchTarget,
    mut source: EventStream,
    tx: mpsc::Sender<ChangeEvent>,
    bookmark: Arc<ArcSwapOption<String>>,
) {
    while let Some(item) = source.next().await {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                warn!(resource = %target, error = %e, "watch stream failed");
                break;
            }
        };

        WATCH_EVENTS.with_label_values(&[event.kind()]).inc();

        let expired = matches!(&event, ChangeEvent::Error(detail) if detail.is_expired());
        if expired {
            bookmark.store(None);
        } else if let Some(version) = event.resource_version() {
            bookmark.store(Some(Arc::new(version.to_string())));
        }

        trace!(resource = %target, kind = event.kind(), "forwarding watch event");
        if tx.send(event).await.is_err() {
            debug!(resource = %target, "watch session receiver dropped");
            return;
        }

        if expired {
            warn!(resource = %target, "resume version expired, closing watch stream");
            break;
        }
    }

    STREAMS_CLOSED.inc();
    debug!(resource = %target, "watch stream ended");
}
