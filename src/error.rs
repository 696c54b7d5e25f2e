//! Error taxonomy for the invocation layer.
//!
//! Three failure kinds flow out of this crate, kept structurally distinct so
//! retry logic (and callers) can switch on them instead of string-matching:
//!
//! - [`CallError::Failed`] - the wrapped callable itself failed (a business
//!   error, carried as a boxed error so any error type fits).
//! - [`CallError::Timeout`] - a configured time budget expired before the
//!   call finished.
//! - [`CallError::Exhausted`] - every permitted retry attempt failed and no
//!   fallback value was supplied; chains the last underlying failure.
//!
//! A fourth kind, [`CallError::ArityMismatch`], is a usage error raised by
//! the multi-dispatch layer before any task is scheduled.

use std::time::Duration;

use thiserror::Error;

/// Boxed error type produced by wrapped callables.
///
/// Handlers registered on an `ErrorMap` match against this via
/// `downcast_ref`, so concrete error types survive the boxing.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by every invocation primitive in this crate.
#[derive(Debug, Error)]
pub enum CallError {
    /// The wrapped callable failed on its own terms.
    #[error("call failed: {0}")]
    Failed(#[source] BoxError),

    /// A configured time budget was exceeded. The in-flight call was
    /// cancelled at the budget boundary.
    #[error("call timed out after {limit:?}{}", .context.as_deref().map(|c| format!(": {c}")).unwrap_or_default())]
    Timeout {
        /// The configured bound that was exceeded.
        limit: Duration,
        /// Optional caller-supplied message attached to the budget.
        context: Option<String>,
    },

    /// The retry budget is spent and no default value was configured.
    #[error("retries exhausted after {attempts} attempts")]
    Exhausted {
        /// Total attempts made, i.e. `num_retries + 1`.
        attempts: u32,
        /// The last business or timeout error observed.
        #[source]
        source: Box<CallError>,
    },

    /// Function list and input list lengths cannot be paired.
    #[error("cannot pair {funcs} functions with {inputs} inputs: need one function or equal lengths")]
    ArityMismatch { funcs: usize, inputs: usize },
}

impl CallError {
    /// Wrap an arbitrary error as a business failure.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
