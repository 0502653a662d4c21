use std::collections::HashMap;

use futures::stream;
use futures::StreamExt;

use crate::constants::WATCH_ERROR_EXPIRED;
use crate::ChangeEvent;
use crate::ErrorDetail;
use crate::EventStream;
use crate::ResourcePayload;
use crate::RetryPolicy;
use crate::WatchError;
use crate::WatchTarget;

pub(crate) fn test_target() -> WatchTarget {
    WatchTarget::new("default", "configmap-test")
}

pub(crate) fn payload(
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

pub(crate) fn created(
    version: &str,
    data: &[(&str, &str)],
) -> ChangeEvent {
    ChangeEvent::Created(payload(version, data))
}

pub(crate) fn modified(
    version: &str,
    data: &[(&str, &str)],
) -> ChangeEvent {
    ChangeEvent::Modified(payload(version, data))
}

pub(crate) fn deleted(
    version: &str,
    data: &[(&str, &str)],
) -> ChangeEvent {
    ChangeEvent::Deleted(payload(version, data))
}

pub(crate) fn expired() -> ChangeEvent {
    ChangeEvent::Error(ErrorDetail::new(WATCH_ERROR_EXPIRED, "too old resource version"))
}

/// Stream that yields `events` and then ends, as if the server closed it
pub(crate) fn closing_stream(events: Vec<ChangeEvent>) -> EventStream {
    stream::iter(events.into_iter().map(Ok)).boxed()
}

/// Stream that yields `events` and then stays open forever
pub(crate) fn open_stream(events: Vec<ChangeEvent>) -> EventStream {
    stream::iter(events.into_iter().map(Ok))
        .chain(stream::pending())
        .boxed()
}

/// Stream that yields `events` and then fails at the transport level
pub(crate) fn failing_stream(events: Vec<ChangeEvent>) -> EventStream {
    stream::iter(events.into_iter().map(Ok))
        .chain(stream::once(async {
            Err(WatchError::from(tonic::Status::unavailable("connection reset")))
        }))
        .boxed()
}

pub(crate) fn unavailable() -> WatchError {
    WatchError::from(tonic::Status::unavailable("watch service unavailable"))
}

/// Fast policy without jitter: delays 10ms, 20ms, 40ms, ...
pub(crate) fn fast_policy(max_attempts: usize) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        timeout_ms: 1_000,
        initial_delay_ms: 10,
        factor: 2.0,
        jitter: 0.0,
        max_delay_ms: 1_000,
    }
}
