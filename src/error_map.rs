//! Ordered error-kind to handler mapping.
//!
//! An [`ErrorMap`] converts a *matching* error into a substitute successful
//! result at the point the error is raised. It is consulted inside
//! [`ucall`](crate::invoke::ucall), before any retry bookkeeping, so a
//! handled error never counts against a retry budget and never becomes a
//! timeout or exhaustion error.
//!
//! Entries are checked in registration order; the first entry whose error
//! type matches (via `downcast_ref`) wins. Handlers may be synchronous or
//! asynchronous.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::error::BoxError;

type Entry<T> = Arc<dyn Fn(&BoxError) -> Option<BoxFuture<'static, T>> + Send + Sync>;

/// Ordered mapping from error type to recovery handler.
pub struct ErrorMap<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Clone for ErrorMap<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for ErrorMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ErrorMap<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorMap")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<T> ErrorMap<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Send + 'static> ErrorMap<T> {
    /// Register a synchronous handler for errors of type `E`.
    #[must_use]
    pub fn on<E, H>(mut self, handler: H) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
        H: Fn(&E) -> T + Send + Sync + 'static,
    {
        self.entries.push(Arc::new(move |err| {
            err.downcast_ref::<E>()
                .map(|e| std::future::ready(handler(e)).boxed())
        }));
        self
    }

    /// Register an asynchronous handler for errors of type `E`.
    #[must_use]
    pub fn on_async<E, H, Fut>(mut self, handler: H) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
        H: Fn(&E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.entries
            .push(Arc::new(move |err| {
                err.downcast_ref::<E>().map(|e| handler(e).boxed())
            }));
        self
    }

    /// Run the first matching handler, if any.
    pub(crate) async fn dispatch(&self, err: &BoxError) -> Option<T> {
        for entry in &self.entries {
            if let Some(substitute) = entry(err) {
                return Some(substitute.await);
            }
        }
        None
    }
}
