use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tonic::async_trait;

use crate::Shutdown;
use crate::ShutdownReason;
use crate::Sleeper;

/// [`Sleeper`] that records requested delays and returns immediately
#[derive(Clone, Default)]
pub(crate) struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub(crate) fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(
        &self,
        duration: Duration,
    ) {
        self.delays.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// [`Shutdown`] that records every reason instead of exiting
#[derive(Clone, Default)]
pub(crate) struct RecordingShutdown {
    reasons: Arc<Mutex<Vec<ShutdownReason>>>,
}

impl RecordingShutdown {
    pub(crate) fn reasons(&self) -> Vec<ShutdownReason> {
        self.reasons.lock().unwrap().clone()
    }
}

impl Shutdown for RecordingShutdown {
    fn shutdown(
        &self,
        reason: &ShutdownReason,
    ) {
        self.reasons.lock().unwrap().push(reason.clone());
    }
}
