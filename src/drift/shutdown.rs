use std::sync::Mutex;

#[cfg(test)]
use mockall::automock;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::constants::EXIT_CODE_CONNECTION_FAILED;
use crate::constants::EXIT_CODE_DRIFT;
use crate::WatchError;
use crate::WatchTarget;

/// Why the process is being terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The tracked field no longer matches its baseline
    Drift {
        field: String,
        baseline: String,
        current: String,
    },
    /// The watch could not be (re-)established within the retry budget
    ConnectionFailed {
        target: WatchTarget,
        attempts: usize,
        cause: String,
    },
}

impl ShutdownReason {
    pub fn connection_failed(
        target: &WatchTarget,
        e: &WatchError,
    ) -> Self {
        let cause = match e {
            WatchError::Connection { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        ShutdownReason::ConnectionFailed {
            target: target.clone(),
            attempts: e.attempts().unwrap_or(0),
            cause,
        }
    }

    /// Process exit status for this reason
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::Drift { .. } => EXIT_CODE_DRIFT,
            ShutdownReason::ConnectionFailed { .. } => EXIT_CODE_CONNECTION_FAILED,
        }
    }

    /// Logs the termination: drift is the expected way out and goes to INFO,
    /// a lost watch goes to ERROR.
    pub(crate) fn announce(&self) {
        let code = self.exit_code();
        match self {
            ShutdownReason::Drift { field, baseline, current } => {
                info!(field = %field, baseline = %baseline, current = %current, code, "terminating process");
            }
            ShutdownReason::ConnectionFailed { target, attempts, cause } => {
                error!(resource = %target, attempts, cause = %cause, code, "terminating process");
            }
        }
    }
}

/// Terminates the host process
///
/// Production implementations do not return. Implementations used when
/// embedding or testing may return, in which case the trigger stops.
#[cfg_attr(test, automock)]
pub trait Shutdown: Send + Sync + 'static {
    fn shutdown(
        &self,
        reason: &ShutdownReason,
    );
}

/// [`Shutdown`] that flushes pending logs and exits the process
#[derive(Default)]
pub struct ProcessShutdown {
    log_guard: Mutex<Option<WorkerGuard>>,
}

impl ProcessShutdown {
    /// Keeps the non-blocking log writer alive until exit so buffered lines
    /// are flushed before the process ends.
    pub fn with_log_guard(guard: WorkerGuard) -> Self {
        Self {
            log_guard: Mutex::new(Some(guard)),
        }
    }
}

impl Shutdown for ProcessShutdown {
    fn shutdown(
        &self,
        reason: &ShutdownReason,
    ) {
        reason.announce();

        match self.log_guard.lock() {
            Ok(mut guard) => drop(guard.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }

        std::process::exit(reason.exit_code());
    }
}
