use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Connection parameters for the remote watch service
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    /// gRPC endpoint of the watch service, e.g. `http://127.0.0.1:9081`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Timeout of unary requests (baseline fetch) in milliseconds.
    /// Never applied to the watch stream itself.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// TCP keepalive in seconds
    #[serde(default = "default_tcp_keepalive")]
    pub tcp_keepalive_in_secs: u64,

    /// HTTP2 keepalive ping interval in seconds
    #[serde(default = "default_h2_keepalive_interval")]
    pub http2_keep_alive_interval_in_secs: u64,

    /// HTTP2 keepalive timeout in seconds
    #[serde(default = "default_h2_keepalive_timeout")]
    pub http2_keep_alive_timeout_in_secs: u64,

    /// Enable gzip on requests and responses
    #[serde(default = "default_enable_compression")]
    pub enable_compression: bool,

    /// Capacity of the per-session event channel
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// PEM root certificate used to verify an `https://` endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
            tcp_keepalive_in_secs: default_tcp_keepalive(),
            http2_keep_alive_interval_in_secs: default_h2_keepalive_interval(),
            http2_keep_alive_timeout_in_secs: default_h2_keepalive_timeout(),
            enable_compression: default_enable_compression(),
            event_buffer_size: default_event_buffer_size(),
            ca_certificate_path: None,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(Error::Config(ConfigError::Message(format!(
                "client endpoint must start with http:// or https://, got {:?}",
                self.endpoint
            ))));
        }

        if self.uses_tls() && self.ca_certificate_path.is_none() {
            return Err(Error::Config(ConfigError::Message(
                "client ca_certificate_path is required for an https:// endpoint".into(),
            )));
        }

        if self.connect_timeout_in_ms == 0 || self.request_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "client connect/request timeouts must be greater than 0".into(),
            )));
        }

        if self.http2_keep_alive_timeout_in_secs >= self.http2_keep_alive_interval_in_secs {
            return Err(Error::Config(ConfigError::Message(format!(
                "http2_keep_alive_timeout_in_secs ({}) must be less than http2_keep_alive_interval_in_secs ({})",
                self.http2_keep_alive_timeout_in_secs, self.http2_keep_alive_interval_in_secs
            ))));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "client event_buffer_size must be greater than 0".into(),
            )));
        }

        Ok(())
    }

    pub fn uses_tls(&self) -> bool {
        self.endpoint.starts_with("https://")
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_in_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:9081".to_string()
}
fn default_connect_timeout() -> u64 {
    3_000
}
fn default_request_timeout() -> u64 {
    5_000
}
fn default_tcp_keepalive() -> u64 {
    300
}
fn default_h2_keepalive_interval() -> u64 {
    30
}
fn default_h2_keepalive_timeout() -> u64 {
    10
}
fn default_enable_compression() -> bool {
    false
}
fn default_event_buffer_size() -> usize {
    64
}
