//! Fan-out properties: batch, chunked, parallel, and multi dispatch.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parcall::{
    BatchResults, BoxError, Callable, ConcurrencyPolicy, RetryPolicy, alcall, bcall, lcall, mcall,
    mcall_explode, pcall,
};

use crate::common::slow;

fn unbounded() -> ConcurrencyPolicy {
    ConcurrencyPolicy::default()
}

fn no_retry() -> RetryPolicy<i64> {
    RetryPolicy::default().quiet()
}

#[tokio::test]
async fn batch_results_come_back_in_input_order_under_random_latency() {
    let results = alcall(
        0..20_i64,
        |x| {
            Callable::from_async(move || async move {
                // Pseudo-random latency keyed off the element.
                let jitter = (x * 37) % 17;
                tokio::time::sleep(Duration::from_millis(5 + jitter as u64)).await;
                Ok(x)
            })
        },
        no_retry(),
        unbounded(),
        None,
    )
    .await
    .unwrap();
    assert_eq!(results.into_vec(), (0..20).collect::<Vec<i64>>());
}

#[tokio::test]
async fn lcall_and_alcall_agree_on_the_squares_scenario() {
    let sequential = lcall([1_i64, 2, 3], |x| x * x);
    let concurrent = alcall(
        [1_i64, 2, 3],
        |x| Callable::from_async(move || async move { Ok(x * x) }),
        no_retry(),
        unbounded(),
        None,
    )
    .await
    .unwrap();
    assert_eq!(sequential.as_slice(), &[1, 4, 9]);
    assert_eq!(concurrent.into_vec(), vec![1, 4, 9]);
}

#[tokio::test]
async fn concurrency_ceiling_holds_for_the_whole_batch() {
    let current = Arc::new(AtomicI64::new(0));
    let peak = Arc::new(AtomicI64::new(0));

    let results = alcall(
        0..10_i64,
        |x| {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            Callable::from_async(move || {
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(15)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(x)
                }
            })
        },
        no_retry(),
        ConcurrencyPolicy::new().with_max_concurrent(2),
        None,
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 10);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn bcall_partitions_ten_inputs_into_four_chunks() {
    let stream = bcall(
        0..10_i64,
        |x| Callable::from_async(move || async move { Ok(x) }),
        NonZeroUsize::new(3).expect("chunk size"),
        no_retry(),
        unbounded(),
        None,
    );
    let batches = stream.try_collect().await.unwrap();
    let sizes: Vec<usize> = batches.iter().map(BatchResults::len).collect();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
}

#[tokio::test]
async fn bcall_schedules_chunks_only_as_consumed() {
    let dispatched = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&dispatched);
    let mut stream = bcall(
        0..6_i64,
        move |x| {
            let seen = Arc::clone(&seen);
            Callable::from_async(move || {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(x)
                }
            })
        },
        NonZeroUsize::new(2).expect("chunk size"),
        no_retry(),
        unbounded(),
        None,
    );

    assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    stream.next().await.expect("first chunk").unwrap();
    assert_eq!(dispatched.load(Ordering::SeqCst), 2);
    stream.next().await.expect("second chunk").unwrap();
    assert_eq!(dispatched.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn pcall_preserves_function_to_result_correspondence() {
    let fxs = vec![
        slow(Duration::from_millis(40), 1),
        slow(Duration::from_millis(5), 2),
        slow(Duration::from_millis(20), 3),
    ];
    let results = pcall(fxs, RetryPolicy::default().quiet(), unbounded(), None)
        .await
        .unwrap();
    assert_eq!(results, vec![1, 2, 3]);
}

#[tokio::test]
async fn mcall_broadcast_matches_alcall() {
    let funcs: Vec<Box<dyn Fn(i64) -> Callable<i64> + Send + Sync>> =
        vec![Box::new(|x| Callable::from_async(move || async move { Ok(x + 1) }))];
    let results = mcall(vec![1, 2, 3], &funcs, no_retry(), unbounded(), None)
        .await
        .unwrap();
    assert_eq!(results, vec![2, 3, 4]);
}

#[tokio::test]
async fn mcall_explode_is_the_cartesian_scenario() {
    let double: Box<dyn Fn(i64) -> Callable<i64> + Send + Sync> =
        Box::new(|x| Callable::from_async(move || async move { Ok(x * 2) }));
    let negate: Box<dyn Fn(i64) -> Callable<i64> + Send + Sync> =
        Box::new(|x| Callable::from_async(move || async move { Ok(-x) }));

    let results = mcall_explode(vec![1, 2], &[double, negate], no_retry(), unbounded(), None)
        .await
        .unwrap();
    let flat: Vec<Vec<i64>> = results.into_iter().map(BatchResults::into_vec).collect();
    assert_eq!(flat, vec![vec![2, 4], vec![-1, -2]]);
}

#[tokio::test]
async fn serialized_pcall_runs_without_time_overlap() {
    let spans: Arc<std::sync::Mutex<Vec<(Instant, Instant)>>> =
        Arc::new(std::sync::Mutex::new(Vec::new()));
    let fxs: Vec<Callable<u32>> = (0..2_u32)
        .map(|i| {
            let spans = Arc::clone(&spans);
            Callable::from_async(move || {
                let spans = Arc::clone(&spans);
                async move {
                    let begin = Instant::now();
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    spans.lock().expect("span log").push((begin, Instant::now()));
                    Ok::<_, BoxError>(i)
                }
            })
        })
        .collect();

    pcall(
        fxs,
        RetryPolicy::default().quiet(),
        ConcurrencyPolicy::new().with_max_concurrent(1),
        None,
    )
    .await
    .unwrap();

    let mut spans = spans.lock().expect("span log").clone();
    spans.sort();
    assert!(spans[1].0 >= spans[0].1, "executions overlapped");
}

#[tokio::test]
async fn batch_throttle_period_paces_the_driver() {
    let period = Duration::from_millis(25);
    let started = Instant::now();
    alcall(
        0..4_i64,
        |x| Callable::from_async(move || async move { Ok(x) }),
        no_retry(),
        ConcurrencyPolicy::new().with_throttle_period(period),
        None,
    )
    .await
    .unwrap();
    // Three pauses between four completions.
    assert!(started.elapsed() >= period * 3);
}
