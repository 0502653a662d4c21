//! # config-sentinel
//!
//! Self-restart trigger for long-running services whose configuration lives
//! in a remote key/value resource.
//!
//! The crate keeps a resilient watch on exactly one resource and compares one
//! data field against the value it had when the process started. When the
//! field changes, the process is terminated with a distinguishable exit status
//! so the supervising platform restarts it with the new configuration.
//!
//! ## Layout
//! - [`WatchSessionManager`] - retried, at-most-one-per-target watch sessions
//!   over a pluggable [`WatchSource`] ([`GrpcWatchSource`] in production)
//! - [`RestartTrigger`] - drift detection on the session's event stream and
//!   process termination through [`Shutdown`]
//! - [`SentinelConfig`] - layered configuration (defaults, file, environment)
//!
//! ## Exit statuses
//! | Status | Cause |
//! |--------|-------|
//! | 1 | tracked field drifted from its baseline |
//! | 2 | watch could not be established within the retry budget |

mod config;
mod drift;
mod errors;
mod watch;

pub mod constants;
pub mod metrics;
pub mod proto;
pub mod utils;

pub use self::config::*;
pub use drift::*;
pub use errors::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
