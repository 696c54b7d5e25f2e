//! Multi-function dispatch: broadcast, zip, and explode composition.
//!
//! [`mcall`] pairs a function list with an input list:
//!
//! - one function, many inputs - **broadcast**: the function is applied to
//!   each element concurrently (equivalent to the batch mapper);
//! - equal lengths - **zip**: function *i* is applied to input *i*, all
//!   pairs concurrent, one result per pair in original order;
//! - anything else is a usage error, raised before any task is scheduled.
//!
//! [`mcall_explode`] is the cartesian mode - every function applied to the
//! *entire* input collection - and is a separate entry point because its
//! result shape differs (one result list per function).

use futures_util::future::try_join_all;

use crate::batch::{BatchResults, ConcurrencyPolicy, alcall, drive};
use crate::callable::Callable;
use crate::error::CallError;
use crate::error_map::ErrorMap;
use crate::retry::RetryPolicy;

/// Broadcast or zip `funcs` over `inputs` (see module docs).
pub async fn mcall<I, T, F>(
    inputs: Vec<I>,
    funcs: &[F],
    policy: RetryPolicy<T>,
    concurrency: ConcurrencyPolicy,
    error_map: Option<ErrorMap<T>>,
) -> Result<Vec<T>, CallError>
where
    T: Clone + Send + 'static,
    F: Fn(I) -> Callable<T>,
{
    let jobs: Vec<Callable<T>> = match funcs {
        [single] => inputs.into_iter().map(single).collect(),
        _ if funcs.len() == inputs.len() => funcs
            .iter()
            .zip(inputs)
            .map(|(f, input)| f(input))
            .collect(),
        _ => {
            return Err(CallError::ArityMismatch {
                funcs: funcs.len(),
                inputs: inputs.len(),
            });
        }
    };

    let timed = drive(jobs, &policy, concurrency, error_map.as_ref()).await?;
    Ok(timed.into_iter().map(|(value, _)| value).collect())
}

/// Apply every function to the entire input collection, one batch run per
/// function, all runs concurrent. Returns one result list per function, in
/// function order. Each run gets its own concurrency scope (semaphore and
/// pacing are per batch run, not global).
pub async fn mcall_explode<I, T, F>(
    inputs: Vec<I>,
    funcs: &[F],
    policy: RetryPolicy<T>,
    concurrency: ConcurrencyPolicy,
    error_map: Option<ErrorMap<T>>,
) -> Result<Vec<BatchResults<T>>, CallError>
where
    I: Clone,
    T: Clone + Send + 'static,
    F: Fn(I) -> Callable<T>,
{
    try_join_all(funcs.iter().map(|f| {
        alcall(
            inputs.clone(),
            f,
            policy.clone(),
            concurrency,
            error_map.clone(),
        )
    }))
    .await
}
