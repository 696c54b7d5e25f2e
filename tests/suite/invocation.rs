//! Single-call properties: unified invocation, timeouts, retries, throttling.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use parcall::{
    BoxError, CallError, Callable, ErrorMap, RetryPolicy, Throttle, TimedPolicy, rcall,
    rcall_timed, tcall, ucall,
};

use crate::common::{fast_retry, flaky, init_tracing, slow};

#[derive(Debug, thiserror::Error)]
#[error("value out of range")]
struct OutOfRange;

#[tokio::test]
async fn error_map_substitutes_a_result_for_a_matching_error() {
    let fx = Callable::<u32>::from_async(|| async { Err(Box::new(OutOfRange) as BoxError) });
    let map = ErrorMap::new().on(|_: &OutOfRange| 0_u32);
    assert_eq!(ucall(&fx, Some(&map)).await.unwrap(), 0);
}

#[tokio::test]
async fn timeout_fires_at_the_bound_not_at_call_completion() {
    // A 200ms call under a 50ms budget must fail near 50ms.
    let fx = slow(Duration::from_millis(200), 1);
    let policy = TimedPolicy::new().with_timeout(Duration::from_millis(50));

    let started = Instant::now();
    let err = tcall(&fx, policy, None).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(150), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn retry_budget_is_spent_exactly() {
    // k failures with num_retries = k succeeds on attempt k + 1.
    let (fx, calls) = flaky(2, 7);
    assert_eq!(rcall(&fx, fast_retry(2), None).await.unwrap(), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // k failures with num_retries = k - 1 exhausts.
    let (fx, calls) = flaky(2, 7);
    let err = rcall(&fx, fast_retry(1), None).await.unwrap_err();
    match err {
        CallError::Exhausted { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("expected Exhausted, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn backoff_delays_follow_the_geometric_sequence() {
    // retry_delay 20ms, factor 2: pre-sleeps of 20, 40, 80ms.
    let (fx, _) = flaky(3, 1);
    let policy = fast_retry(3)
        .with_retry_delay(Duration::from_millis(20))
        .with_backoff_factor(2.0);

    let (value, elapsed) = rcall_timed(&fx, policy, None).await.unwrap();
    assert_eq!(value, 1);
    assert!(elapsed >= Duration::from_millis(140), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(500), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn exhaustion_with_default_returns_the_default() {
    let (fx, _) = flaky(99, 1);
    let policy = fast_retry(1).or_default(42);
    assert_eq!(rcall(&fx, policy, None).await.unwrap(), 42);
}

#[tokio::test]
async fn sync_callables_retry_like_async_ones() {
    let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let fx = Callable::from_sync(move || {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            Err::<u32, BoxError>("cold start".into())
        } else {
            Ok(11)
        }
    });
    assert_eq!(rcall(&fx, fast_retry(1), None).await.unwrap(), 11);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn verbose_retries_log_through_the_installed_subscriber() {
    // Re-initialization must be a no-op, not a panic.
    init_tracing();
    init_tracing();

    // Default (verbose) policy: the failed attempt emits a warning through
    // the subscriber installed by the fixtures.
    let (fx, calls) = flaky(1, 9);
    let policy = RetryPolicy::new(1).with_retry_delay(Duration::from_millis(1));
    assert_eq!(rcall(&fx, policy, None).await.unwrap(), 9);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn throttled_dispatches_are_spaced_between_starts() {
    let period = Duration::from_millis(60);
    let throttle = Arc::new(Throttle::new(period));
    // The wrapped call finishes quickly; spacing must still be >= period
    // measured between dispatch starts.
    let fx = throttle.wrap(slow(Duration::from_millis(5), 1));

    let started = Instant::now();
    fx.invoke().await.unwrap();
    fx.invoke().await.unwrap();
    assert!(started.elapsed() >= period, "elapsed {:?}", started.elapsed());
}

#[tokio::test]
async fn throttle_composes_with_retry() {
    let period = Duration::from_millis(30);
    let throttle = Arc::new(Throttle::new(period));
    let (inner, calls) = flaky(1, 5);
    let fx = throttle.wrap(inner);

    let started = Instant::now();
    assert_eq!(rcall(&fx, fast_retry(1), None).await.unwrap(), 5);
    // Two dispatches through the throttle: one failure, one success.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= period);
}
