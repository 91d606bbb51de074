//! Integration tests for the readiness poller.
//!
//! Uses `start_paused = true` so Tokio's clock only moves when every task
//! is idle: a 250 ms period costs no wall-clock time and tick counts are
//! deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use ualkit_poll::{CancellationToken, PollConfig, PollOutcome, ReadinessPoller};

// =========================================================================
// Helpers
// =========================================================================

/// A condition that becomes true on the `n`th check.
fn ready_after(n: u64) -> impl FnMut() -> bool {
    let mut checks = 0;
    move || {
        checks += 1;
        checks >= n
    }
}

// =========================================================================
// PollConfig
// =========================================================================

#[test]
fn test_default_config_polls_every_250ms_forever() {
    let cfg = PollConfig::default();
    assert_eq!(cfg.interval(), Duration::from_millis(250));
    assert_eq!(cfg.max_ticks, None);
}

#[test]
fn test_with_interval_sets_period() {
    let cfg = PollConfig::with_interval(Duration::from_millis(40));
    assert_eq!(cfg.interval_ms, 40);
}

#[test]
fn test_config_deserializes_without_max_ticks() {
    let cfg: PollConfig = serde_json::from_str(r#"{"interval_ms": 100}"#).unwrap();
    assert_eq!(cfg.interval_ms, 100);
    assert_eq!(cfg.max_ticks, None);
}

// =========================================================================
// Waiting
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_check_happens_after_one_period() {
    let mut poller = ReadinessPoller::new(PollConfig::default());
    let start = Instant::now();

    let outcome = poller.wait_until(|| true).await;

    assert_eq!(outcome, PollOutcome::Ready { ticks: 1 });
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(250), "checked too early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "checked too late: {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_ready_on_nth_check_counts_ticks() {
    let mut poller = ReadinessPoller::new(PollConfig::default());
    let start = Instant::now();

    let outcome = poller.wait_until(ready_after(4)).await;

    assert_eq!(outcome, PollOutcome::Ready { ticks: 4 });
    assert_eq!(poller.ticks(), 4);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1000));
    assert!(elapsed < Duration::from_millis(1100));
}

#[tokio::test(start_paused = true)]
async fn test_condition_flipped_by_another_task() {
    // The usual shape: a wallet finishes initializing in the background
    // while the poller re-checks its loading flag.
    let loading = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&loading);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(600)).await;
        flag.store(false, Ordering::SeqCst);
    });

    let mut poller = ReadinessPoller::new(PollConfig::default());
    let outcome = poller.wait_until(|| !loading.load(Ordering::SeqCst)).await;

    // Checks at 250 and 500 see loading; the one at 750 doesn't.
    assert_eq!(outcome, PollOutcome::Ready { ticks: 3 });
}

#[tokio::test(start_paused = true)]
async fn test_max_ticks_times_out() {
    let mut poller = ReadinessPoller::new(PollConfig {
        interval_ms: 250,
        max_ticks: Some(3),
    });

    let outcome = poller.wait_until(|| false).await;

    assert_eq!(outcome, PollOutcome::TimedOut { ticks: 3 });
}

// =========================================================================
// Cancellation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_waiting() {
    let mut poller = ReadinessPoller::new(PollConfig::default());
    let token = poller.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(800)).await;
        token.cancel();
    });

    let outcome = poller.wait_until(|| false).await;

    assert_eq!(outcome, PollOutcome::Cancelled { ticks: 3 });
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_wait_returns_immediately() {
    let mut poller = ReadinessPoller::new(PollConfig::default());
    poller.cancel_token().cancel();
    let start = Instant::now();

    let outcome = poller.wait_until(|| true).await;

    assert_eq!(outcome, PollOutcome::Cancelled { ticks: 0 });
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_ready_cancels_token_so_external_cancel_is_noop() {
    let mut poller = ReadinessPoller::new(PollConfig::default());
    let token = poller.cancel_token();

    poller.wait_until(|| true).await;

    assert!(token.is_cancelled());
    token.cancel();
    assert!(token.is_cancelled(), "cancelling a finished poller is a no-op");
}

#[tokio::test(start_paused = true)]
async fn test_poller_is_single_use() {
    let mut poller = ReadinessPoller::new(PollConfig::default());
    poller.wait_until(|| true).await;

    let second = poller.wait_until(|| true).await;

    assert!(matches!(second, PollOutcome::Cancelled { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_future_resolves_for_every_clone() {
    let token = CancellationToken::new();
    let waiters = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();
    for _ in 0..3 {
        let t = token.clone();
        let w = Arc::clone(&waiters);
        handles.push(tokio::spawn(async move {
            t.cancelled().await;
            w.fetch_add(1, Ordering::SeqCst);
        }));
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(waiters.load(Ordering::SeqCst), 0);

    token.cancel();
    for h in handles {
        h.await.unwrap();
    }
    assert_eq!(waiters.load(Ordering::SeqCst), 3);
}
