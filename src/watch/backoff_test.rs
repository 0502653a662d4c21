use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::*;
use crate::test_utils::*;
use crate::RetryPolicy;
use crate::WatchError;

fn policy(
    max_attempts: usize,
    jitter: f64,
) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        timeout_ms: 1_000,
        initial_delay_ms: 100,
        factor: 2.0,
        jitter,
        max_delay_ms: 1_000,
    }
}

fn seeded(policy: RetryPolicy) -> Backoff<StdRng> {
    Backoff::with_rng(policy, StdRng::seed_from_u64(7))
}

#[test]
fn without_jitter_delays_double_until_cap() {
    let mut backoff = seeded(policy(10, 0.0));

    let delays: Vec<u128> = std::iter::from_fn(|| backoff.next_delay())
        .map(|d| d.as_millis())
        .collect();

    assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000, 1000, 1000, 1000]);
}

#[test]
fn n_attempts_produce_n_minus_one_delays() {
    for n in 1..6 {
        let mut backoff = seeded(policy(n, 0.1));
        let mut delays = 0;
        while backoff.next_delay().is_some() {
            delays += 1;
        }
        assert_eq!(delays, n - 1, "max_attempts = {n}");
        assert_eq!(backoff.failed_attempts(), n);
    }
}

#[test]
fn every_delay_stays_within_jitter_bounds_of_previous() {
    let jitter = 0.25;
    let p = RetryPolicy {
        max_delay_ms: 60_000,
        ..policy(30, jitter)
    };
    let mut backoff = seeded(p);

    let first = backoff.next_delay().unwrap();
    assert!(first >= Duration::from_millis(75) && first <= Duration::from_millis(125));

    let mut prev = first;
    while let Some(delay) = backoff.next_delay() {
        let low = prev.as_secs_f64() * p.factor * (1.0 - jitter);
        let high = prev.as_secs_f64() * p.factor * (1.0 + jitter);
        let cap = p.max_delay().as_secs_f64();
        let d = delay.as_secs_f64();

        assert!(d <= cap + 1e-9, "delay {d} above cap");
        assert!(
            (d >= low.min(cap) - 1e-9) && d <= high.min(cap) + 1e-9,
            "delay {d} outside [{low}, {high}] (prev {prev:?})"
        );
        prev = delay;
    }
}

#[test]
fn unbounded_policy_never_exhausts() {
    let mut backoff = seeded(policy(0, 0.1));
    for _ in 0..1_000 {
        let delay = backoff.next_delay().expect("unbounded");
        assert!(delay <= Duration::from_millis(1_000));
    }
    assert_eq!(backoff.last_delay(), Some(Duration::from_millis(1_000)));
}

#[test]
fn huge_factor_saturates_at_cap() {
    let p = RetryPolicy {
        factor: 1e300,
        ..policy(5, 0.0)
    };
    let mut backoff = seeded(p);

    assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1_000)));
    assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1_000)));
}

#[tokio::test(start_paused = true)]
async fn tokio_sleeper_advances_paused_clock() {
    let start = tokio::time::Instant::now();
    TokioSleeper.sleep(Duration::from_secs(30)).await;
    assert!(start.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn retry_with_backoff_returns_first_success() {
    let sleeper = RecordingSleeper::default();
    let counter = AtomicUsize::new(0);
    let calls = &counter;

    let value = retry_with_backoff(&test_target(), fast_policy(5), &sleeper, || async move {
        match calls.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => Err(unavailable()),
            _ => Ok("info"),
        }
    })
    .await
    .expect("third attempt succeeds");

    assert_eq!(value, "info");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(10), Duration::from_millis(20)]
    );
}

#[tokio::test(start_paused = true)]
async fn retry_with_backoff_gives_up_with_last_cause() {
    let sleeper = RecordingSleeper::default();
    let counter = AtomicUsize::new(0);
    let calls = &counter;

    let result: std::result::Result<(), WatchError> =
        retry_with_backoff(&test_target(), fast_policy(3), &sleeper, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.delays().len(), 2);
    match result {
        Err(WatchError::Connection { target, attempts, source }) => {
            assert_eq!(target, test_target());
            assert_eq!(attempts, 3);
            assert!(matches!(*source, WatchError::Transport(_)));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn retry_with_backoff_times_out_stalled_attempts() {
    let sleeper = RecordingSleeper::default();

    let result: std::result::Result<(), WatchError> =
        retry_with_backoff(&test_target(), fast_policy(2), &sleeper, || std::future::pending()).await;

    match result {
        Err(WatchError::Connection { attempts, source, .. }) => {
            assert_eq!(attempts, 2);
            assert!(matches!(*source, WatchError::Timeout(d) if d == Duration::from_millis(1_000)));
        }
        other => panic!("unexpected result {other:?}"),
    }
}
