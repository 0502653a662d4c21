//! Sentinel Error Hierarchy
//!
//! Defines the error types surfaced by configuration loading and by the watch
//! layer. Only two conditions are allowed to escape the watch layer:
//! [`WatchError::Connection`] after the retry budget is spent, and the closed
//! event stream (which is a signal, not an error).

use std::time::Duration;

use config::ConfigError;

use crate::WatchTarget;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Watch subscription failures
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Log directory and file failures
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Retry budget exhausted while establishing the subscription
    #[error("Cannot create watcher for {target} after {attempts} attempts: {source}")]
    Connection {
        target: WatchTarget,
        attempts: usize,
        #[source]
        source: Box<WatchError>,
    },

    /// A live session already exists for the target
    #[error("A watch session is already active for {0}")]
    SessionActive(WatchTarget),

    /// A single subscribe attempt did not complete in time
    #[error("Subscribe attempt timed out after {0:?}")]
    Timeout(Duration),

    /// gRPC status returned by the watch service
    #[error(transparent)]
    Transport(#[from] Box<tonic::Status>),

    /// Endpoint parsing or channel establishment failures
    #[error(transparent)]
    Endpoint(#[from] Box<tonic::transport::Error>),
}

impl From<tonic::Status> for WatchError {
    fn from(status: tonic::Status) -> Self {
        WatchError::Transport(Box::new(status))
    }
}

impl From<tonic::transport::Error> for WatchError {
    fn from(e: tonic::transport::Error) -> Self {
        WatchError::Endpoint(Box::new(e))
    }
}

impl WatchError {
    /// Number of subscribe attempts made before giving up, if this is a
    /// connection failure.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            WatchError::Connection { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
