//! Watch session layer
//!
//! Turns a remote subscribe-by-name call into a resilient, ordered stream of
//! [`ChangeEvent`]s for exactly one [`WatchTarget`]:
//! - [`WatchSource`] - the transport seam (gRPC in production, mocks in tests)
//! - [`WatchSessionManager`] - retries subscription with [`Backoff`] and
//!   enforces one live session per target
//! - [`WatchSession`] - the live subscription; dropping it closes the source
//!
//! Connection-establishment failures are retried internally. A subscription
//! that dies after it was established is reported by closing the session's
//! stream; resubscribing is the caller's decision.

mod backoff;
mod event;
mod grpc_source;
mod manager;
mod session;
mod target;

pub use backoff::*;
pub use event::*;
pub use grpc_source::*;
pub use manager::*;
pub use session::*;
pub use target::*;

#[cfg(test)]
mod backoff_test;

use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use crate::WatchError;

/// Raw event stream produced by one subscription.
///
/// An `Err` item means the subscription failed irrecoverably; the session
/// closes after it.
pub type EventStream = BoxStream<'static, std::result::Result<ChangeEvent, WatchError>>;

/// Remote watch protocol: subscribe to change events of one named resource
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WatchSource: Send + Sync + 'static {
    /// Opens a subscription filtered to exactly `target`.
    ///
    /// # Arguments
    /// * `target` - namespace and name of the resource
    /// * `resume_from` - last resource version seen for this target; the
    ///   server starts after it. `None` starts from the current state.
    async fn subscribe(
        &self,
        target: &WatchTarget,
        resume_from: Option<String>,
    ) -> std::result::Result<EventStream, WatchError>;
}
