//! Cooperative chunked processing.
//!
//! Items are handed to a consumer in fixed-size chunks. Before every chunk
//! the scheduler suspends for `yield_delay`, so no item is processed until
//! the first suspension point has returned and no single turn runs longer
//! than one chunk. Chunks run strictly in order; there is no parallelism
//! and no mid-batch cancellation.

use serde::Serialize;
use std::time::Duration;

/// Tuning for one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Items per chunk, at least one
    pub chunk_size: usize,
    /// Suspension before each chunk, never zero
    pub yield_delay: Duration,
    /// Progress is reported each time this many more items are processed
    pub progress_every: usize,
}

impl BatchConfig {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), ..Self::default() }
    }

    pub fn with_yield_delay(mut self, delay: Duration) -> Self {
        self.yield_delay = delay;
        self
    }

    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every;
        self
    }

    /// Number of chunks needed for `total` items
    pub fn chunk_count(&self, total: usize) -> usize {
        total.div_ceil(self.chunk_size.max(1))
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { chunk_size: 100, yield_delay: Duration::from_millis(10), progress_every: 500 }
    }
}

/// `(processed, total)` progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub chunks: usize,
    pub processed: usize,
}

/// Feeds items to a consumer across cooperative scheduling turns
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchScheduler {
    config: BatchConfig,
}

impl BatchScheduler {
    pub fn new(config: BatchConfig) -> Self {
        let config = BatchConfig {
            chunk_size: config.chunk_size.max(1),
            yield_delay: config.yield_delay.max(Duration::from_millis(1)),
            progress_every: config.progress_every.max(1),
        };
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Process `items` chunk by chunk.
    ///
    /// `consume` receives the chunk index and the chunk's items. `progress`
    /// is invoked whenever another `progress_every` items have been
    /// processed and always once on completion.
    pub async fn run<T, C, P>(&self, items: Vec<T>, mut consume: C, mut progress: P) -> BatchReport
    where
        C: FnMut(usize, Vec<T>),
        P: FnMut(Progress),
    {
        let total = items.len();
        let mut remaining = items.into_iter();
        let mut processed = 0;
        let mut chunks = 0;
        let mut last_reported = 0;

        while processed < total {
            tokio::time::sleep(self.config.yield_delay).await;

            let chunk: Vec<T> = remaining.by_ref().take(self.config.chunk_size).collect();
            processed += chunk.len();
            consume(chunks, chunk);
            chunks += 1;

            tracing::trace!(chunk = chunks, processed, total, "Batch chunk attached");

            let crossed = processed / self.config.progress_every
                > last_reported / self.config.progress_every;
            if crossed && processed < total {
                progress(Progress { processed, total });
                last_reported = processed;
            }
        }

        progress(Progress { processed, total });
        BatchReport { total, chunks, processed }
    }
}
