//! Minimum-interval dispatch throttling.
//!
//! A [`Throttle`] spaces successive *dispatches* of the callables routed
//! through it by at least `period`. Spacing is measured between dispatch
//! start times, never between completions, so a slow call banks no credit
//! for the next one.
//!
//! The instance is the unit of coupling: wrap several callables (or share
//! one wrapped callable across call sites) with the same `Arc<Throttle>` and
//! their pacing is deliberately coupled. State is a single timestamp guarded
//! by a mutex held only long enough to reserve the next dispatch slot; the
//! wait itself happens outside the lock.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::callable::{CallKind, Callable};

/// Stateful rate limiter enforcing a minimum interval between dispatches.
#[derive(Debug)]
pub struct Throttle {
    period: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Throttle {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_dispatch: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Reserve the next dispatch slot and advance `last_dispatch` to it.
    ///
    /// Advancing under the lock is what serializes spacing for concurrent
    /// callers: each one reserves a distinct slot before anyone sleeps.
    fn reserve(&self) -> Instant {
        let mut last = self
            .last_dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let slot = match *last {
            Some(prev) if prev + self.period > now => prev + self.period,
            _ => now,
        };
        *last = Some(slot);
        slot
    }

    /// Wait (non-blocking) until the next dispatch slot.
    pub async fn acquire(&self) {
        let slot = self.reserve();
        let now = Instant::now();
        if slot > now {
            tokio::time::sleep(slot - now).await;
        }
    }

    /// Wait (blocking) until the next dispatch slot. For synchronous
    /// callables already running on the blocking pool.
    pub fn acquire_blocking(&self) {
        let slot = self.reserve();
        let now = Instant::now();
        if slot > now {
            std::thread::sleep(slot - now);
        }
    }

    /// Wrap a callable so every dispatch first waits for a slot.
    ///
    /// Async callables wait cooperatively; sync callables wait with a
    /// blocking sleep on their worker thread. The wrapped callable keeps its
    /// sync/async tag.
    #[must_use]
    pub fn wrap<T: Send + 'static>(self: &Arc<Self>, fx: Callable<T>) -> Callable<T> {
        let throttle = Arc::clone(self);
        match fx.kind {
            CallKind::Sync(inner) => Callable::from_sync(move || {
                throttle.acquire_blocking();
                inner()
            }),
            CallKind::Async(inner) => Callable::from_async(move || {
                let throttle = Arc::clone(&throttle);
                let inner = Arc::clone(&inner);
                async move {
                    throttle.acquire().await;
                    inner().await
                }
            }),
        }
    }
}
