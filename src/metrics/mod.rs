use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    pub static ref CONNECT_ATTEMPTS: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_connect_attempts", "Subscribe attempts by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref SESSIONS_OPENED: IntCounter =
        IntCounter::new("watch_sessions_opened", "Watch sessions established")
            .expect("metric can not be created");

    pub static ref STREAMS_CLOSED: IntCounter =
        IntCounter::new("watch_streams_closed", "Watch streams ended by the remote side or by failure")
            .expect("metric can not be created");

    pub static ref WATCH_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_events", "Change events received by kind"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref ERROR_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_error_events", "In-band watch errors by code"),
        &["code"]
    )
    .expect("metric can not be created");

    pub static ref DRIFT_DETECTED: IntCounter =
        IntCounter::new("drift_detected", "Tracked field changes that triggered a restart")
            .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

fn register_custom_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(CONNECT_ATTEMPTS.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(SESSIONS_OPENED.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(STREAMS_CLOSED.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(WATCH_EVENTS.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(ERROR_EVENTS.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(DRIFT_DETECTED.clone()))
            .expect("collector can be registered");
    });
}

/// Serves `/metrics` until `shutdown` is cancelled
pub async fn start_server(
    port: u16,
    shutdown: CancellationToken,
) {
    register_custom_metrics();

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    let bound = warp::serve(metrics_route).try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
        shutdown.cancelled().await;
    });
    match bound {
        Ok((addr, server)) => {
            info!(%addr, "metrics server listening");
            server.await;
        }
        Err(e) => error!(port, error = %e, "failed to bind metrics server"),
    }
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(gather_metrics())
}

/// Text exposition of the sentinel metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;

    register_custom_metrics();
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            warn!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
