//! Bounded retry with multiplicative backoff.
//!
//! # Retry discipline
//!
//! - Sleep `initial_delay` once, then attempt up to `num_retries + 1` times.
//! - Each attempt routes through [`ucall`](crate::invoke::ucall): an error
//!   map match substitutes a result immediately and consumes no retry
//!   budget.
//! - Between failed attempts the current delay is slept and then multiplied
//!   by `backoff_factor`, so the pre-sleep of attempt *k* is
//!   `retry_delay * backoff_factor^(k-1)`. The factor compounds per failed
//!   attempt, not per elapsed time.
//! - On exhaustion: return the configured default if one was supplied,
//!   otherwise raise [`CallError::Exhausted`] chaining the last failure.
//!
//! Unmapped business errors and per-attempt timeouts both count as failed
//! attempts.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};

use crate::callable::Callable;
use crate::error::CallError;
use crate::error_map::ErrorMap;
use crate::invoke::ucall;

/// Retry configuration for [`rcall`] and the batch/parallel primitives.
///
/// The default policy makes a single attempt with no delays - retries are
/// opt-in per call site.
#[derive(Debug, Clone)]
pub struct RetryPolicy<T> {
    /// Retries permitted after the first attempt; total attempts on full
    /// exhaustion are `num_retries + 1`.
    pub num_retries: u32,
    /// One-time suspension before the first attempt.
    pub initial_delay: Duration,
    /// Sleep before the first retry; grows by `backoff_factor` thereafter.
    pub retry_delay: Duration,
    /// Multiplier applied to `retry_delay` after each failed attempt. Must
    /// be >= 1.
    pub backoff_factor: f64,
    /// Value returned on exhaustion. `None` means exhaustion raises.
    ///
    /// `Option` is doing the sentinel's job here: absence is structurally
    /// distinct from any present value, including a present `None`-like one.
    pub default: Option<T>,
    /// Time budget applied to every individual attempt.
    pub timeout: Option<Duration>,
    /// Emit a `tracing` notice (attempt count, error, delay) per retry.
    pub verbose: bool,
}

impl<T> Default for RetryPolicy<T> {
    fn default() -> Self {
        Self {
            num_retries: 0,
            initial_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            backoff_factor: 1.0,
            default: None,
            timeout: None,
            verbose: true,
        }
    }
}

impl<T> RetryPolicy<T> {
    #[must_use]
    pub fn new(num_retries: u32) -> Self {
        Self {
            num_retries,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor.max(1.0);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Return `value` instead of raising when the retry budget is spent.
    #[must_use]
    pub fn or_default(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }

    /// Sleep before retry number `retry_index` (zero-based):
    /// `retry_delay * backoff_factor^retry_index`.
    fn backoff_delay(&self, retry_index: u32) -> Duration {
        if self.backoff_factor <= 1.0 {
            return self.retry_delay;
        }
        self.retry_delay
            .mul_f64(self.backoff_factor.powi(retry_index as i32))
    }
}

/// Invoke `fx` under `policy`, retrying failed attempts.
pub async fn rcall<T>(
    fx: &Callable<T>,
    policy: RetryPolicy<T>,
    error_map: Option<&ErrorMap<T>>,
) -> Result<T, CallError>
where
    T: Send + 'static,
{
    retry_inner(fx, policy, error_map)
        .await
        .map(|(value, _)| value)
}

/// Like [`rcall`], also reporting elapsed wall time from the first dispatch
/// (after `initial_delay`) to the final outcome, retries included.
pub async fn rcall_timed<T>(
    fx: &Callable<T>,
    policy: RetryPolicy<T>,
    error_map: Option<&ErrorMap<T>>,
) -> Result<(T, Duration), CallError>
where
    T: Send + 'static,
{
    retry_inner(fx, policy, error_map).await
}

async fn retry_inner<T>(
    fx: &Callable<T>,
    policy: RetryPolicy<T>,
    error_map: Option<&ErrorMap<T>>,
) -> Result<(T, Duration), CallError>
where
    T: Send + 'static,
{
    if !policy.initial_delay.is_zero() {
        sleep(policy.initial_delay).await;
    }

    let started = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        let outcome = match policy.timeout {
            Some(limit) => match timeout(limit, ucall(fx, error_map)).await {
                Ok(result) => result,
                Err(_) => Err(CallError::Timeout {
                    limit,
                    context: None,
                }),
            },
            None => ucall(fx, error_map).await,
        };

        let err = match outcome {
            Ok(value) => return Ok((value, started.elapsed())),
            Err(err) => err,
        };

        if attempt >= policy.num_retries {
            return match policy.default {
                Some(value) => Ok((value, started.elapsed())),
                None => Err(CallError::Exhausted {
                    attempts: policy.num_retries + 1,
                    source: Box::new(err),
                }),
            };
        }

        let delay = policy.backoff_delay(attempt);
        if policy.verbose {
            tracing::warn!(
                attempt = attempt + 1,
                remaining = policy.num_retries - attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "call failed, retrying"
            );
        } else {
            tracing::debug!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "call failed, retrying"
            );
        }
        if !delay.is_zero() {
            sleep(delay).await;
        }
        attempt += 1;
    }
}
