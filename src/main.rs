use std::process::ExitCode;

use config::ConfigError;
use config_sentinel::constants::EXIT_CODE_CONNECTION_FAILED;
use config_sentinel::constants::LOG_FILE_NAME;
use config_sentinel::metrics;
use config_sentinel::retry_with_backoff;
use config_sentinel::utils::file_io::open_file_for_append;
use config_sentinel::Error;
use config_sentinel::FieldSelector;
use config_sentinel::GrpcWatchSource;
use config_sentinel::MonitoringConfig;
use config_sentinel::ProcessShutdown;
use config_sentinel::RestartTrigger;
use config_sentinel::Result;
use config_sentinel::RunOutcome;
use config_sentinel::SentinelConfig;
use config_sentinel::TokioSleeper;
use config_sentinel::WatchSessionManager;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("config-sentinel failed to start: {e}");
            ExitCode::from(EXIT_CODE_CONNECTION_FAILED as u8)
        }
    }
}

async fn run() -> Result<()> {
    let settings = SentinelConfig::new()?.validate()?;

    // Initializing Logs
    let guard = init_observability(&settings.monitoring)?;

    // Initializing Shutdown Signal
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = graceful_shutdown(cancel).await {
                error!("Failed to install signal handlers: {:?}", e);
            }
        }
    });

    if settings.monitoring.prometheus_enabled {
        tokio::spawn(metrics::start_server(
            settings.monitoring.prometheus_port,
            cancel.child_token(),
        ));
    }

    let source = GrpcWatchSource::new(&settings.client)?;
    let selector = resolve_baseline(&settings, &source).await?;

    let manager = WatchSessionManager::new(source, settings.client.event_buffer_size);
    let trigger = RestartTrigger::new(manager, ProcessShutdown::with_log_guard(guard));

    match trigger.run(&settings.target, &selector, settings.retry, cancel).await {
        RunOutcome::Cancelled => info!("Watcher stopped"),
        RunOutcome::Shutdown(reason) => info!(?reason, "Shutdown requested"),
    }

    Ok(())
}

/// Baseline from configuration, or the field's current value read from the
/// watch service under the same retry policy as the watch itself.
async fn resolve_baseline(
    settings: &SentinelConfig,
    source: &GrpcWatchSource,
) -> Result<FieldSelector> {
    let selector = &settings.selector;
    if let Some(baseline) = &selector.baseline {
        return Ok(selector.with_baseline(baseline.clone()));
    }

    let target = &settings.target;
    let resource = retry_with_backoff(target, settings.retry, &TokioSleeper, || source.fetch(target)).await?;
    match resource.get(&selector.field) {
        Some(value) => {
            info!(field = %selector.field, baseline = value, "captured baseline");
            Ok(selector.with_baseline(value))
        }
        None => Err(Error::Config(ConfigError::Message(format!(
            "field {} is missing from {}",
            selector.field, settings.target
        )))),
    }
}

async fn graceful_shutdown(cancel: CancellationToken) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
    }

    cancel.cancel();
    info!("Shutdown completed");
    Ok(())
}

pub fn init_observability(settings: &MonitoringConfig) -> Result<WorkerGuard> {
    let (non_blocking, guard) = match &settings.log_dir {
        Some(log_dir) => {
            let log_file = open_file_for_append(&log_dir.join(LOG_FILE_NAME))?;
            tracing_appender::non_blocking(log_file)
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(filter);
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
