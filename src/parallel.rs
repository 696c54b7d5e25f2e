//! Parallel execution of distinct callables.
//!
//! [`pcall`] is the function-list dual of [`alcall`](crate::batch::alcall):
//! the varying dimension is *which callable* runs, not which input it gets.
//! Scheduling is the same discipline - index-tagged tasks under a shared
//! retry policy, semaphore, and completion-paced throttle - and the output
//! holds one result per input callable, in original list order.

use std::time::Duration;

use crate::batch::{ConcurrencyPolicy, drive};
use crate::callable::Callable;
use crate::error::CallError;
use crate::error_map::ErrorMap;
use crate::retry::RetryPolicy;

/// Run every callable concurrently under one shared policy.
///
/// Failure semantics mirror the batch mapper: the first callable to exhaust
/// its retries without a configured default fails the whole call.
pub async fn pcall<T>(
    fxs: impl IntoIterator<Item = Callable<T>>,
    policy: RetryPolicy<T>,
    concurrency: ConcurrencyPolicy,
    error_map: Option<ErrorMap<T>>,
) -> Result<Vec<T>, CallError>
where
    T: Clone + Send + 'static,
{
    let timed = drive(
        fxs.into_iter().collect(),
        &policy,
        concurrency,
        error_map.as_ref(),
    )
    .await?;
    Ok(timed.into_iter().map(|(value, _)| value).collect())
}

/// Like [`pcall`], also reporting each callable's elapsed time.
pub async fn pcall_timed<T>(
    fxs: impl IntoIterator<Item = Callable<T>>,
    policy: RetryPolicy<T>,
    concurrency: ConcurrencyPolicy,
    error_map: Option<ErrorMap<T>>,
) -> Result<Vec<(T, Duration)>, CallError>
where
    T: Clone + Send + 'static,
{
    drive(
        fxs.into_iter().collect(),
        &policy,
        concurrency,
        error_map.as_ref(),
    )
    .await
}
