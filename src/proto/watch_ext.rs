use super::watch::EventType;
use super::watch::GetRequest;
use super::watch::Resource;
use super::watch::WatchRequest;
use super::watch::WatchResponse;
use crate::ChangeEvent;
use crate::ErrorDetail;
use crate::ResourcePayload;
use crate::WatchTarget;

/// In-band error code for responses that cannot be mapped to a change event
pub(crate) const MALFORMED_RESPONSE: &str = "MALFORMED";

impl WatchRequest {
    pub fn for_target(
        target: &WatchTarget,
        resume_from: Option<String>,
    ) -> Self {
        Self {
            namespace: target.namespace.clone(),
            name: target.name.clone(),
            resource_version: resume_from.unwrap_or_default(),
        }
    }
}

impl GetRequest {
    pub fn for_target(target: &WatchTarget) -> Self {
        Self {
            namespace: target.namespace.clone(),
            name: target.name.clone(),
        }
    }
}

impl From<Resource> for ResourcePayload {
    fn from(resource: Resource) -> Self {
        ResourcePayload::new(resource.resource_version, resource.data)
    }
}

/// Malformed responses become [`ChangeEvent::Error`] so a single bad frame
/// never tears the subscription down.
impl From<WatchResponse> for ChangeEvent {
    fn from(response: WatchResponse) -> Self {
        let event_type = EventType::try_from(response.event_type).unwrap_or(EventType::Unspecified);

        let with_payload = |build: fn(ResourcePayload) -> ChangeEvent, resource: Option<Resource>| match resource {
            Some(resource) => build(resource.into()),
            None => malformed(format!("{} event without resource", event_type.as_str_name())),
        };

        match event_type {
            EventType::Added => with_payload(ChangeEvent::Created, response.resource),
            EventType::Modified => with_payload(ChangeEvent::Modified, response.resource),
            EventType::Deleted => with_payload(ChangeEvent::Deleted, response.resource),
            EventType::Error => match response.error {
                Some(status) => ChangeEvent::Error(ErrorDetail::new(status.code, status.message)),
                None => ChangeEvent::Error(ErrorDetail::new("UNKNOWN", "error event without detail")),
            },
            EventType::Unspecified => malformed(format!("unknown event type {}", response.event_type)),
        }
    }
}

fn malformed(message: String) -> ChangeEvent {
    ChangeEvent::Error(ErrorDetail::new(MALFORMED_RESPONSE, message))
}
