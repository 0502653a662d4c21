use std::time::Duration;

use futures::StreamExt;
use tonic::async_trait;
use tonic::codec::CompressionEncoding;
use tonic::transport::Certificate;
use tonic::transport::Channel;
use tonic::transport::ClientTlsConfig;
use tonic::transport::Endpoint;
use tracing::debug;

use super::ChangeEvent;
use super::EventStream;
use super::ResourcePayload;
use super::WatchSource;
use super::WatchTarget;
use crate::proto::watch::resource_watch_client::ResourceWatchClient;
use crate::proto::watch::GetRequest;
use crate::proto::watch::WatchRequest;
use crate::ClientConfig;
use crate::Result;
use crate::WatchError;

/// [`WatchSource`] backed by the `ResourceWatch` gRPC service
///
/// The channel is created lazily; connection failures surface on the first
/// call and are retried by the session manager.
#[derive(Clone)]
pub struct GrpcWatchSource {
    channel: Channel,
    settings: ClientConfig,
}

impl GrpcWatchSource {
    /// Builds the channel without connecting.
    ///
    /// # Errors
    /// - [`WatchError::Endpoint`] for an unparsable endpoint or TLS setup
    /// - I/O error when the CA certificate cannot be read
    pub fn new(settings: &ClientConfig) -> Result<Self> {
        let mut endpoint = Endpoint::from_shared(settings.endpoint.clone())
            .map_err(WatchError::from)?
            .connect_timeout(settings.connect_timeout())
            .tcp_keepalive(Some(Duration::from_secs(settings.tcp_keepalive_in_secs)))
            .http2_keep_alive_interval(Duration::from_secs(settings.http2_keep_alive_interval_in_secs))
            .keep_alive_timeout(Duration::from_secs(settings.http2_keep_alive_timeout_in_secs))
            .keep_alive_while_idle(true);

        if settings.uses_tls() {
            let mut tls = ClientTlsConfig::new();
            if let Some(path) = &settings.ca_certificate_path {
                let pem = std::fs::read(path)?;
                tls = tls.ca_certificate(Certificate::from_pem(pem));
            }
            endpoint = endpoint.tls_config(tls).map_err(WatchError::from)?;
        }

        let channel = endpoint.connect_lazy();

        Ok(Self {
            channel,
            settings: settings.clone(),
        })
    }

    fn client(&self) -> ResourceWatchClient<Channel> {
        let client = ResourceWatchClient::new(self.channel.clone());
        if self.settings.enable_compression {
            client
                .send_compressed(CompressionEncoding::Gzip)
                .accept_compressed(CompressionEncoding::Gzip)
        } else {
            client
        }
    }

    /// Reads the current state of `target` with a single unary call.
    pub async fn fetch(
        &self,
        target: &WatchTarget,
    ) -> std::result::Result<ResourcePayload, WatchError> {
        let mut request = tonic::Request::new(GetRequest::for_target(target));
        request.set_timeout(self.settings.request_timeout());

        let resource = self.client().get(request).await?.into_inner();
        debug!(resource = %target, version = %resource.resource_version, "fetched resource");
        Ok(resource.into())
    }
}

#[async_trait]
impl WatchSource for GrpcWatchSource {
    async fn subscribe(
        &self,
        target: &WatchTarget,
        resume_from: Option<String>,
    ) -> std::result::Result<EventStream, WatchError> {
        let request = WatchRequest::for_target(target, resume_from);
        let stream = self.client().watch(request).await?.into_inner();

        Ok(stream
            .map(|item| item.map(ChangeEvent::from).map_err(WatchError::from))
            .boxed())
    }
}
