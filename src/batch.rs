//! Order-preserving batch mapping.
//!
//! [`alcall`] fans one function out over a list of inputs: every element
//! gets its own task, each independently retried and timed under a shared
//! [`RetryPolicy`], with a shared semaphore bounding concurrency and an
//! optional completion-paced throttle. Tasks are tagged with their original
//! index and results sorted by that tag before return, so output order
//! always equals input order no matter which task finishes first.
//!
//! [`lcall`] is the synchronous sibling: a plain sequential map with the
//! same list-shaping surface and no retry, timeout, or concurrency.
//!
//! List shaping (`flatten` / `dropna` / `unique`) lives on the
//! [`BatchResults`] wrapper as combinators, each available exactly where the
//! element type supports it. Chain them in that order to reproduce the
//! legacy flag semantics.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::callable::Callable;
use crate::error::CallError;
use crate::error_map::ErrorMap;
use crate::retry::{RetryPolicy, rcall_timed};

/// Shared concurrency controls for the batch/parallel primitives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrencyPolicy {
    /// Ceiling on in-flight calls, enforced by a semaphore scoped to one
    /// batch/parallel invocation. `None` means unbounded.
    pub max_concurrent: Option<usize>,
    /// Pause inserted by the driver after each completed call before
    /// collecting the next - a global pacing knob independent of per-call
    /// retry delay.
    pub throttle_period: Option<Duration>,
}

impl ConcurrencyPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = Some(limit);
        self
    }

    #[must_use]
    pub fn with_throttle_period(mut self, period: Duration) -> Self {
        self.throttle_period = Some(period);
        self
    }
}

/// An ordered batch result with list-shaping combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResults<T>(Vec<T>);

impl<T> BatchResults<T> {
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Drop duplicate values, keeping the first occurrence of each.
    #[must_use]
    pub fn unique(self) -> Self
    where
        T: PartialEq,
    {
        let mut seen: Vec<T> = Vec::with_capacity(self.0.len());
        for value in self.0 {
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        Self(seen)
    }
}

impl<T> BatchResults<Vec<T>> {
    /// Flatten one level of nesting.
    #[must_use]
    pub fn flatten(self) -> BatchResults<T> {
        BatchResults(self.0.into_iter().flatten().collect())
    }
}

impl<T> BatchResults<Option<T>> {
    /// Drop absent values.
    #[must_use]
    pub fn dropna(self) -> BatchResults<T> {
        BatchResults(self.0.into_iter().flatten().collect())
    }
}

impl<T> From<Vec<T>> for BatchResults<T> {
    fn from(values: Vec<T>) -> Self {
        Self(values)
    }
}

impl<T> IntoIterator for BatchResults<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a BatchResults<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Map `f` over `inputs` sequentially.
///
/// The synchronous path is deliberately plain: no retries, no timeouts, no
/// concurrency. Shape the output with the [`BatchResults`] combinators.
pub fn lcall<I, T, F>(inputs: impl IntoIterator<Item = I>, f: F) -> BatchResults<T>
where
    F: FnMut(I) -> T,
{
    BatchResults(inputs.into_iter().map(f).collect())
}

/// Map `f` over `inputs` concurrently, preserving input order.
///
/// `f` is resolved once per element into a [`Callable`]; each element then
/// runs the full retry discipline of [`rcall`](crate::retry::rcall) under
/// the shared policy. An element that exhausts its retries without a
/// configured default fails the whole batch: the first such error (in
/// completion order) is returned and the remaining results are discarded,
/// though already-spawned siblings run on to completion.
pub async fn alcall<I, T, F>(
    inputs: impl IntoIterator<Item = I>,
    f: F,
    policy: RetryPolicy<T>,
    concurrency: ConcurrencyPolicy,
    error_map: Option<ErrorMap<T>>,
) -> Result<BatchResults<T>, CallError>
where
    T: Clone + Send + 'static,
    F: Fn(I) -> Callable<T>,
{
    let jobs: Vec<Callable<T>> = inputs.into_iter().map(f).collect();
    let timed = drive(jobs, &policy, concurrency, error_map.as_ref()).await?;
    Ok(BatchResults(
        timed.into_iter().map(|(value, _)| value).collect(),
    ))
}

/// Like [`alcall`], also reporting per-element elapsed time (retries
/// included, queueing behind the semaphore excluded).
pub async fn alcall_timed<I, T, F>(
    inputs: impl IntoIterator<Item = I>,
    f: F,
    policy: RetryPolicy<T>,
    concurrency: ConcurrencyPolicy,
    error_map: Option<ErrorMap<T>>,
) -> Result<Vec<(T, Duration)>, CallError>
where
    T: Clone + Send + 'static,
    F: Fn(I) -> Callable<T>,
{
    let jobs: Vec<Callable<T>> = inputs.into_iter().map(f).collect();
    drive(jobs, &policy, concurrency, error_map.as_ref()).await
}

/// Fan `jobs` out under the shared policy and return `(value, elapsed)`
/// pairs in original job order.
///
/// One task per job: acquire the semaphore (when bounded), run the retry
/// discipline, report back tagged with the original index. Completions are
/// drained in arbitrary order, pacing by `throttle_period` between them,
/// then sorted by tag.
pub(crate) async fn drive<T>(
    jobs: Vec<Callable<T>>,
    policy: &RetryPolicy<T>,
    concurrency: ConcurrencyPolicy,
    error_map: Option<&ErrorMap<T>>,
) -> Result<Vec<(T, Duration)>, CallError>
where
    T: Clone + Send + 'static,
{
    let semaphore = concurrency.max_concurrent.map(|n| Arc::new(Semaphore::new(n)));

    let mut in_flight = FuturesUnordered::new();
    for (index, fx) in jobs.into_iter().enumerate() {
        let policy = policy.clone();
        let error_map = error_map.cloned();
        let semaphore = semaphore.clone();
        in_flight.push(tokio::spawn(async move {
            let _permit = match semaphore {
                Some(sem) => Some(
                    sem.acquire_owned()
                        .await
                        .map_err(|closed| CallError::Failed(Box::new(closed)))?,
                ),
                None => None,
            };
            let (value, elapsed) = rcall_timed(&fx, policy, error_map.as_ref()).await?;
            Ok::<_, CallError>((index, value, elapsed))
        }));
    }

    let mut tagged = Vec::with_capacity(in_flight.len());
    while let Some(joined) = in_flight.next().await {
        let entry = joined.map_err(|join_err| CallError::Failed(Box::new(join_err)))??;
        tagged.push(entry);
        if let Some(period) = concurrency.throttle_period
            && !in_flight.is_empty()
        {
            sleep(period).await;
        }
    }

    tagged.sort_unstable_by_key(|entry: &(usize, T, Duration)| entry.0);
    Ok(tagged
        .into_iter()
        .map(|(_, value, elapsed)| (value, elapsed))
        .collect())
}
