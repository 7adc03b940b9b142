//! Chunked, bounded-concurrency execution.
//!
//! Work items are split into contiguous chunks. Every item of a chunk runs
//! concurrently and results are yielded in completion order; the next chunk
//! starts only once the whole current chunk has finished. Peak concurrency is
//! therefore bounded by the chunk size.
//!
//! Units run cooperatively on the polling task rather than being spawned, so
//! they may borrow from the caller. A unit reports failure through its output
//! value; one unit failing never cancels its siblings. There are no retries
//! here.

use std::future::Future;

use futures::stream::{self, FuturesUnordered, Stream, StreamExt};

pub const DEFAULT_CHUNK_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchScheduler {
  chunk_size: usize,
}

impl Default for BatchScheduler {
  fn default() -> Self { Self::new(DEFAULT_CHUNK_SIZE) }
}

impl BatchScheduler {
  /// A chunk size of zero is treated as one.
  pub fn new(chunk_size: usize) -> Self {
    Self {
      chunk_size: chunk_size.max(1),
    }
  }

  pub fn chunk_size(&self) -> usize { self.chunk_size }

  /// Split `items` into contiguous chunks, preserving order.
  pub fn chunks<T>(&self, items: Vec<T>) -> Vec<Vec<T>> {
    let mut chunks = Vec::with_capacity(items.len().div_ceil(self.chunk_size));
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
      chunks.push(items.by_ref().take(self.chunk_size).collect());
    }
    chunks
  }

  /// Run `task` over every item, one chunk at a time.
  ///
  /// The returned stream yields each unit's output as it completes. Futures
  /// for a chunk are created only after the previous chunk is drained.
  pub fn run<T, F, Fut>(
    self,
    items: Vec<T>,
    mut task: F,
  ) -> impl Stream<Item = Fut::Output>
  where
    F: FnMut(T) -> Fut,
    Fut: Future,
  {
    let chunks = self.chunks(items);
    let batches = chunks.len();

    stream::iter(chunks.into_iter().enumerate()).flat_map(
      move |(idx, chunk)| {
        tracing::info!(
          batch = idx + 1,
          batches,
          size = chunk.len(),
          "processing batch {} of {batches} batches",
          idx + 1
        );
        chunk
          .into_iter()
          .map(&mut task)
          .collect::<FuturesUnordered<_>>()
      },
    )
  }
}
