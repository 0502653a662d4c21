use std::sync::Arc;
use std::time::Duration;

use config_sentinel::constants::EXIT_CODE_CONNECTION_FAILED;
use config_sentinel::constants::EXIT_CODE_DRIFT;
use config_sentinel::ChangeEvent;
use config_sentinel::RestartTrigger;
use config_sentinel::RunOutcome;
use config_sentinel::SelectorConfig;
use config_sentinel::ShutdownReason;
use config_sentinel::WatchSessionManager;
use config_sentinel::WatchTarget;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

use crate::common::configmap;
use crate::common::quick_retry;
use crate::common::RecordingShutdown;
use crate::common::Script;
use crate::common::ScriptedSource;

fn target() -> WatchTarget {
    WatchTarget::new("default", "configmap-test")
}

/// Baseline `LOG_LEVEL=info`; the resource is created with `info`, then
/// modified to `debug`. Exactly one restart with exit status 1.
#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_log_level_change_restarts_once() {
    let source = ScriptedSource::new(vec![Script::Hold(vec![
        ChangeEvent::Created(configmap("1", &[("LOG_LEVEL", "info"), ("HTTP_PORT", "8888")])),
        ChangeEvent::Modified(configmap("2", &[("LOG_LEVEL", "info"), ("HTTP_PORT", "9999")])),
        ChangeEvent::Modified(configmap("3", &[("LOG_LEVEL", "debug"), ("HTTP_PORT", "9999")])),
        ChangeEvent::Modified(configmap("4", &[("LOG_LEVEL", "trace"), ("HTTP_PORT", "9999")])),
    ])]);
    let shutdown = RecordingShutdown::default();
    let trigger = RestartTrigger::new(WatchSessionManager::new(source, 16), shutdown.clone());
    let selector = SelectorConfig::default().with_baseline("info");

    let outcome = trigger
        .run(&target(), &selector, quick_retry(3), CancellationToken::new())
        .await;

    let reasons = shutdown.reasons();
    assert_eq!(reasons.len(), 1, "exactly one restart");
    assert_eq!(outcome, RunOutcome::Shutdown(reasons[0].clone()));
    assert_eq!(
        reasons[0],
        ShutdownReason::Drift {
            field: "LOG_LEVEL".into(),
            baseline: "info".into(),
            current: "debug".into(),
        }
    );
    assert_eq!(reasons[0].exit_code(), EXIT_CODE_DRIFT);
    assert!(logs_contain("restarting to apply updated configuration"));
    assert!(logs_contain("current=info"));
    assert!(logs_contain("new=debug"));
}

/// The server closes the stream twice; the watch resumes from the last seen
/// version each time and the baseline is kept.
#[tokio::test(start_paused = true)]
async fn test_resubscribes_after_server_close() {
    let source = ScriptedSource::new(vec![
        Script::Close(vec![ChangeEvent::Created(configmap("1", &[("LOG_LEVEL", "info")]))]),
        Script::Close(vec![ChangeEvent::Modified(configmap("2", &[("LOG_LEVEL", "info")]))]),
        Script::Hold(vec![ChangeEvent::Modified(configmap("3", &[("LOG_LEVEL", "warn")]))]),
    ]);
    let shutdown = RecordingShutdown::default();
    let trigger = RestartTrigger::new(WatchSessionManager::new(source.clone(), 16), shutdown.clone());
    let selector = SelectorConfig::default().with_baseline("info");

    trigger
        .run(&target(), &selector, quick_retry(3), CancellationToken::new())
        .await;

    assert_eq!(
        source.resumed_from(),
        vec![None, Some("1".to_string()), Some("2".to_string())]
    );
    assert_eq!(shutdown.reasons().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_service_exits_with_connection_status() {
    let source = ScriptedSource::new(vec![Script::Unavailable, Script::Unavailable]);
    let shutdown = RecordingShutdown::default();
    let trigger = RestartTrigger::new(WatchSessionManager::new(source.clone(), 16), shutdown.clone());
    let selector = SelectorConfig::default().with_baseline("info");

    trigger
        .run(&target(), &selector, quick_retry(4), CancellationToken::new())
        .await;

    assert_eq!(source.resumed_from().len(), 4);
    let reasons = shutdown.reasons();
    assert_eq!(reasons.len(), 1);
    assert_eq!(reasons[0].exit_code(), EXIT_CODE_CONNECTION_FAILED);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_without_restart() {
    let source = ScriptedSource::new(vec![Script::Hold(vec![ChangeEvent::Deleted(configmap(
        "5",
        &[("LOG_LEVEL", "debug")],
    ))])]);
    let shutdown = RecordingShutdown::default();
    let trigger = Arc::new(RestartTrigger::new(WatchSessionManager::new(source, 16), shutdown.clone()));
    let cancel = CancellationToken::new();

    let handle = {
        let trigger = trigger.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let selector = SelectorConfig::default().with_baseline("info");
            trigger.run(&target(), &selector, quick_retry(3), cancel).await
        })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    assert_eq!(handle.await.unwrap(), RunOutcome::Cancelled);
    assert!(shutdown.reasons().is_empty());
}
