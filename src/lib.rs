//! Resilient concurrent function invocation.
//!
//! `parcall` takes callables - synchronous or asynchronous - and executes
//! them under one asynchronous contract, layering on timeout enforcement,
//! bounded retry with exponential backoff, rate throttling, bounded
//! concurrency, and order-preserving batch/parallel fan-out.
//!
//! # Primitives
//!
//! | Entry point | Does |
//! |-------------|------|
//! | [`ucall`] | invoke once, with error-map substitution |
//! | [`tcall`] / [`tcall_timed`] | initial delay, hard timeout, optional suppress-with-default |
//! | [`rcall`] / [`rcall_timed`] | bounded retry with multiplicative backoff |
//! | [`lcall`] | sequential map with list shaping |
//! | [`alcall`] / [`alcall_timed`] | concurrent map, input-order results |
//! | [`bcall`] | lazy chunk-by-chunk batch streaming |
//! | [`pcall`] / [`pcall_timed`] | run a list of distinct callables |
//! | [`mcall`] / [`mcall_explode`] | broadcast / zip / cartesian dispatch |
//!
//! [`Throttle`] is orthogonal: wrap any [`Callable`] to enforce a minimum
//! interval between dispatches.
//!
//! # Contract
//!
//! Everything funnels through [`ucall`], so the propagation policy is
//! uniform: an [`ErrorMap`] match substitutes a successful result before any
//! retry or timeout bookkeeping; unmapped business errors and timeouts count
//! as failed attempts; exhaustion either returns the configured default or
//! raises [`CallError::Exhausted`] chaining the last failure. Batch and
//! parallel outputs are always aligned 1:1 with inputs by original position,
//! regardless of completion order.
//!
//! # Example
//!
//! ```
//! use parcall::{Callable, ConcurrencyPolicy, RetryPolicy, alcall};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), parcall::CallError> {
//! let squares = alcall(
//!     [1_i64, 2, 3],
//!     |x| Callable::from_async(move || async move { Ok(x * x) }),
//!     RetryPolicy::new(2).with_retry_delay(Duration::from_millis(10)),
//!     ConcurrencyPolicy::new().with_max_concurrent(2),
//!     None,
//! )
//! .await?;
//! assert_eq!(squares.into_vec(), vec![1, 4, 9]);
//! # Ok(())
//! # }
//! ```
//!
//! All primitives require an ambient tokio runtime; the crate never creates
//! one. Synchronous callables run on the runtime's blocking pool, so they
//! never stall the cooperative scheduler.

pub mod batch;
pub mod callable;
pub mod chunk;
pub mod error;
pub mod error_map;
pub mod invoke;
pub mod multi;
pub mod parallel;
pub mod retry;
pub mod throttle;

pub use batch::{BatchResults, ConcurrencyPolicy, alcall, alcall_timed, lcall};
pub use callable::Callable;
pub use chunk::{ChunkStream, bcall};
pub use error::{BoxError, CallError};
pub use error_map::ErrorMap;
pub use invoke::{TimedPolicy, tcall, tcall_timed, ucall};
pub use multi::{mcall, mcall_explode};
pub use parallel::{pcall, pcall_timed};
pub use retry::{RetryPolicy, rcall, rcall_timed};
pub use throttle::Throttle;
