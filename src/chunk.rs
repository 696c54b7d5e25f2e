//! Chunked batch streaming.
//!
//! [`bcall`] partitions an input sequence into consecutive fixed-size chunks
//! and hands back a [`ChunkStream`]: a lazy, finite, non-restartable
//! sequence of batch results. Nothing is scheduled up front - chunk *n+1*
//! does not start until the caller asks for it, which makes the stream a
//! backpressure valve over a large input.
//!
//! The chunk size is a [`NonZeroUsize`], so an empty chunking is
//! unrepresentable rather than a runtime error.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::batch::{BatchResults, ConcurrencyPolicy, alcall};
use crate::callable::Callable;
use crate::error::CallError;
use crate::error_map::ErrorMap;
use crate::retry::RetryPolicy;

/// Partition `inputs` into chunks of `batch_size` and stream one batch
/// result per chunk. The last chunk may be shorter.
pub fn bcall<I, T, F>(
    inputs: impl IntoIterator<Item = I>,
    f: F,
    batch_size: NonZeroUsize,
    policy: RetryPolicy<T>,
    concurrency: ConcurrencyPolicy,
    error_map: Option<ErrorMap<T>>,
) -> ChunkStream<I, T, F>
where
    T: Clone + Send + 'static,
    F: Fn(I) -> Callable<T>,
{
    let size = batch_size.get();
    let mut chunks: VecDeque<Vec<I>> = VecDeque::new();
    let mut current: Vec<I> = Vec::with_capacity(size);
    for input in inputs {
        current.push(input);
        if current.len() == size {
            chunks.push_back(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        chunks.push_back(current);
    }

    ChunkStream {
        chunks,
        f,
        policy,
        concurrency,
        error_map,
    }
}

/// Lazy sequence of per-chunk batch results produced by [`bcall`].
#[derive(Debug)]
pub struct ChunkStream<I, T, F> {
    chunks: VecDeque<Vec<I>>,
    f: F,
    policy: RetryPolicy<T>,
    concurrency: ConcurrencyPolicy,
    error_map: Option<ErrorMap<T>>,
}

impl<I, T, F> ChunkStream<I, T, F>
where
    T: Clone + Send + 'static,
    F: Fn(I) -> Callable<T>,
{
    /// Run the next chunk through the batch discipline. `None` once the
    /// input is exhausted; a consumed chunk is gone even if it failed.
    pub async fn next(&mut self) -> Option<Result<BatchResults<T>, CallError>> {
        let chunk = self.chunks.pop_front()?;
        Some(
            alcall(
                chunk,
                &self.f,
                self.policy.clone(),
                self.concurrency,
                self.error_map.clone(),
            )
            .await,
        )
    }

    /// Chunks not yet dispatched.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }

    /// Drain every remaining chunk, stopping at the first failed one.
    pub async fn try_collect(mut self) -> Result<Vec<BatchResults<T>>, CallError> {
        let mut batches = Vec::with_capacity(self.chunks.len());
        while let Some(batch) = self.next().await {
            batches.push(batch?);
        }
        Ok(batches)
    }
}
