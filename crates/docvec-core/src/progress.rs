//! Migration progress events.
//!
//! The pipeline reports what it is doing through [`ProgressReporter`];
//! the `docvec` app renders events on stderr (human or JSON lines) so
//! stdout stays parseable.

/// A single progress event emitted by [`migrate`](crate::pipeline::migrate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationProgressEvent {
    /// A document was split into `chunks` chunks.
    Chunked { source: String, chunks: usize },
    /// Embeddings for batch `batch` of `total` arrived (`chunks` in the batch).
    Embedding {
        batch: usize,
        total: usize,
        chunks: usize,
    },
    /// Batch `batch` of `total` was upserted; `records` so far in this run.
    Upserted {
        batch: usize,
        total: usize,
        records: usize,
    },
}

/// Receives migration progress. Implementations must not block for long.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: MigrationProgressEvent);
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: MigrationProgressEvent) {}
}
