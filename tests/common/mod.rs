use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use config_sentinel::ChangeEvent;
use config_sentinel::EventStream;
use config_sentinel::ResourcePayload;
use config_sentinel::RetryPolicy;
use config_sentinel::Shutdown;
use config_sentinel::ShutdownReason;
use config_sentinel::WatchError;
use config_sentinel::WatchSource;
use config_sentinel::WatchTarget;
use futures::stream;
use futures::StreamExt;
use tonic::async_trait;

/// One scripted answer to a subscribe call
pub enum Script {
    /// Subscription fails with `UNAVAILABLE`
    Unavailable,
    /// Subscription yields the events and the server closes the stream
    Close(Vec<ChangeEvent>),
    /// Subscription yields the events and stays open
    Hold(Vec<ChangeEvent>),
}

/// [`WatchSource`] replaying a fixed list of subscribe answers
#[derive(Clone, Default)]
pub struct ScriptedSource {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    resumed_from: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedSource {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            resumed_from: Arc::default(),
        }
    }

    pub fn resumed_from(&self) -> Vec<Option<String>> {
        self.resumed_from.lock().unwrap().clone()
    }
}

#[async_trait]
impl WatchSource for ScriptedSource {
    async fn subscribe(
        &self,
        _target: &WatchTarget,
        resume_from: Option<String>,
    ) -> Result<EventStream, WatchError> {
        self.resumed_from.lock().unwrap().push(resume_from);

        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Unavailable) | None => Err(tonic::Status::unavailable("watch service unavailable").into()),
            Some(Script::Close(events)) => Ok(stream::iter(events.into_iter().map(Ok)).boxed()),
            Some(Script::Hold(events)) => Ok(stream::iter(events.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
        }
    }
}

/// [`Shutdown`] recording reasons instead of exiting
#[derive(Clone, Default)]
pub struct RecordingShutdown {
    reasons: Arc<Mutex<Vec<ShutdownReason>>>,
}

impl RecordingShutdown {
    pub fn reasons(&self) -> Vec<ShutdownReason> {
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

pub fn configmap(
    version: &str,
    data: &[(&str, &str)],
) -> ResourcePayload {
    ResourcePayload::new(
        version,
        data.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    )
}

pub fn quick_retry(max_attempts: usize) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        timeout_ms: 1_000,
        initial_delay_ms: 10,
        factor: 2.0,
        jitter: 0.1,
        max_delay_ms: 100,
    }
}
