use std::collections::HashMap;

use crate::constants::WATCH_ERROR_EXPIRED;

/// Full current state of the watched resource as carried by an event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePayload {
    /// Opaque server version, used to resume a watch
    pub resource_version: String,
    /// Key/value data of the resource
    pub data: HashMap<String, String>,
}

impl ResourcePayload {
    pub fn new(
        resource_version: impl Into<String>,
        data: HashMap<String, String>,
    ) -> Self {
        Self {
            resource_version: resource_version.into(),
            data,
        }
    }

    pub fn get(
        &self,
        field: &str,
    ) -> Option<&str> {
        self.data.get(field).map(String::as_str)
    }
}

/// In-band error reported by the watch service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The resume version is too old; the subscription cannot continue
    pub fn is_expired(&self) -> bool {
        self.code == WATCH_ERROR_EXPIRED
    }
}

/// One change notification for the watched resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(ResourcePayload),
    Modified(ResourcePayload),
    Deleted(ResourcePayload),
    Error(ErrorDetail),
}

impl ChangeEvent {
    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Created(_) => "created",
            ChangeEvent::Modified(_) => "modified",
            ChangeEvent::Deleted(_) => "deleted",
            ChangeEvent::Error(_) => "error",
        }
    }

    pub fn payload(&self) -> Option<&ResourcePayload> {
        match self {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) | ChangeEvent::Deleted(p) => Some(p),
            ChangeEvent::Error(_) => None,
        }
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.payload()
            .map(|p| p.resource_version.as_str())
            .filter(|v| !v.is_empty())
    }
}
