//! Callable adaptation: one asynchronous contract over sync and async work.
//!
//! A [`Callable`] is tagged once, at construction, as synchronous or
//! asynchronous - there is no per-invocation probing and no global "is this
//! async" cache. Both variants hold a *factory* rather than a future, so the
//! retry layer can dispatch the same callable repeatedly.
//!
//! Synchronous work is offloaded to the runtime's bounded blocking pool
//! (`tokio::task::spawn_blocking`); it never blocks the cooperative
//! scheduler, CPU-bound callables included. The awaiting task suspends until
//! the worker thread finishes.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::error::BoxError;

pub(crate) type SyncFactory<T> = dyn Fn() -> Result<T, BoxError> + Send + Sync;
pub(crate) type AsyncFactory<T> = dyn Fn() -> BoxFuture<'static, Result<T, BoxError>> + Send + Sync;

/// A unit of work producing `T` or failing with a [`BoxError`].
///
/// Cheap to clone: the underlying factory is shared, so one callable can be
/// handed to many concurrent tasks.
pub struct Callable<T> {
    pub(crate) kind: CallKind<T>,
}

pub(crate) enum CallKind<T> {
    Sync(Arc<SyncFactory<T>>),
    Async(Arc<AsyncFactory<T>>),
}

impl<T> Clone for Callable<T> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            CallKind::Sync(f) => CallKind::Sync(Arc::clone(f)),
            CallKind::Async(f) => CallKind::Async(Arc::clone(f)),
        };
        Self { kind }
    }
}

impl<T> std::fmt::Debug for Callable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.kind {
            CallKind::Sync(_) => "Callable::Sync",
            CallKind::Async(_) => "Callable::Async",
        };
        f.write_str(tag)
    }
}

impl<T: Send + 'static> Callable<T> {
    /// Adapt a synchronous callable. Each invocation runs on the blocking
    /// pool so the event loop stays responsive.
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            kind: CallKind::Sync(Arc::new(f)),
        }
    }

    /// Adapt an asynchronous callable. The factory is stored unchanged.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        Self {
            kind: CallKind::Async(Arc::new(move || f().boxed())),
        }
    }

    /// A callable that always succeeds with a fixed value. Useful for
    /// defaults and probes.
    pub fn from_value(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_sync(move || Ok(value.clone()))
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self.kind, CallKind::Async(_))
    }

    /// Dispatch the callable once.
    ///
    /// The underlying error propagates unchanged. A panic on the blocking
    /// pool surfaces as an error here rather than unwinding the caller.
    pub async fn invoke(&self) -> Result<T, BoxError> {
        match &self.kind {
            CallKind::Async(f) => f().await,
            CallKind::Sync(f) => {
                let f = Arc::clone(f);
                tokio::task::spawn_blocking(move || f())
                    .await
                    .map_err(|join_err| Box::new(join_err) as BoxError)?
            }
        }
    }
}
