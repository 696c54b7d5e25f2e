//! Single-shot invocation: the unified funnel and its timed wrapper.
//!
//! [`ucall`] dispatches a callable exactly once and applies the error map.
//! Every other primitive in the crate routes its underlying call through it,
//! which is what makes the propagation policy uniform: error substitution
//! happens here, before any retry or timeout bookkeeping upstream.
//!
//! [`tcall`] adds an initial delay, a hard timeout, and an optional
//! suppress-and-return-default mode; [`tcall_timed`] additionally reports
//! the elapsed wall time of the invocation.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};

use crate::callable::Callable;
use crate::error::CallError;
use crate::error_map::ErrorMap;

/// Invoke `fx` exactly once.
///
/// On failure, the first matching [`ErrorMap`] entry converts the error into
/// a substitute successful result - a substitution, not a retry. Unmatched
/// errors surface as [`CallError::Failed`] with the original error chained.
pub async fn ucall<T>(fx: &Callable<T>, error_map: Option<&ErrorMap<T>>) -> Result<T, CallError>
where
    T: Send + 'static,
{
    match fx.invoke().await {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Some(map) = error_map
                && let Some(substitute) = map.dispatch(&err).await
            {
                return Ok(substitute);
            }
            Err(CallError::Failed(err))
        }
    }
}

/// Time-budget configuration for [`tcall`] / [`tcall_timed`].
#[derive(Debug, Clone)]
pub struct TimedPolicy<T> {
    /// Suspension before the call is dispatched. Not counted as elapsed time.
    pub initial_delay: Duration,
    /// Hard bound on the invocation. Expiry cancels the in-flight call.
    pub timeout: Option<Duration>,
    /// Message attached to the timeout error, for caller context.
    pub context: Option<String>,
    /// When set, any error (timeout included) is swallowed and this value is
    /// returned instead.
    pub default: Option<T>,
}

impl<T> Default for TimedPolicy<T> {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            timeout: None,
            context: None,
            default: None,
        }
    }
}

impl<T> TimedPolicy<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Suppress errors and return `value` in their place.
    #[must_use]
    pub fn or_default(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }
}

/// Invoke `fx` once under a time budget.
pub async fn tcall<T>(
    fx: &Callable<T>,
    policy: TimedPolicy<T>,
    error_map: Option<&ErrorMap<T>>,
) -> Result<T, CallError>
where
    T: Send + 'static,
{
    timed_inner(fx, policy, error_map)
        .await
        .map(|(value, _)| value)
}

/// Like [`tcall`], also reporting elapsed wall time.
///
/// Elapsed time is measured on a monotonic clock from just before the call
/// is dispatched, i.e. after `initial_delay`.
pub async fn tcall_timed<T>(
    fx: &Callable<T>,
    policy: TimedPolicy<T>,
    error_map: Option<&ErrorMap<T>>,
) -> Result<(T, Duration), CallError>
where
    T: Send + 'static,
{
    timed_inner(fx, policy, error_map).await
}

async fn timed_inner<T>(
    fx: &Callable<T>,
    policy: TimedPolicy<T>,
    error_map: Option<&ErrorMap<T>>,
) -> Result<(T, Duration), CallError>
where
    T: Send + 'static,
{
    if !policy.initial_delay.is_zero() {
        sleep(policy.initial_delay).await;
    }

    let started = Instant::now();
    let outcome = match policy.timeout {
        Some(limit) => match timeout(limit, ucall(fx, error_map)).await {
            Ok(result) => result,
            Err(_) => Err(CallError::Timeout {
                limit,
                context: policy.context,
            }),
        },
        None => ucall(fx, error_map).await,
    };

    match outcome {
        Ok(value) => Ok((value, started.elapsed())),
        Err(err) => match policy.default {
            Some(value) => Ok((value, started.elapsed())),
            None => Err(err),
        },
    }
}
