//! Source and target adapter contracts.
//!
//! Concrete adapters (files, databases, HTTP) live outside this crate;
//! the engine only consumes these object-safe traits. Each partition
//! opens its own handles through an [`AdapterFactory`].

use async_trait::async_trait;
use floodgate_types::batch::RecordBatch;
use floodgate_types::cursor::CursorValue;
use floodgate_types::partition::PartitionSpec;

/// Adapter failure, classified for the retry path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// I/O failure worth retrying (connection reset, timeout, lock
    /// contention).
    #[error("transient i/o error: {0}")]
    Transient(String),

    /// Failure that retrying cannot fix (bad credentials, malformed
    /// payload, constraint violation).
    #[error("adapter error: {0}")]
    Fatal(String),
}

impl AdapterError {
    /// Returns `true` for the retryable class.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// One pulled batch plus the exhaustion flag.
#[derive(Debug, Clone)]
pub struct SourcePull {
    /// The pulled rows; may be empty on the final pull.
    pub batch: RecordBatch,
    /// `true` when the source has no further rows for this run.
    pub exhausted: bool,
}

/// Result of one atomic batch commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Rows the target accepted. Equals the batch row count on success;
    /// commits are whole-batch or nothing.
    pub rows_written: u64,
}

/// Read side of a partition: hands out bounded batches until exhausted.
#[async_trait]
pub trait SourceAdapter: Send {
    /// Pull up to `max_rows` rows, scoped to records after `since` when
    /// incremental mode supplies a watermark.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Transient`] for retryable I/O failures,
    /// [`AdapterError::Fatal`] otherwise.
    async fn pull_batch(
        &mut self,
        max_rows: usize,
        since: Option<&CursorValue>,
    ) -> Result<SourcePull, AdapterError>;
}

/// Write side of a partition: commits whole batches atomically.
#[async_trait]
pub trait TargetAdapter: Send {
    /// Commit every row of `batch`, or none of them.
    ///
    /// `append` distinguishes append-only loads from per-batch replace
    /// semantics; the adapter owns the distinction.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Transient`] for retryable I/O failures,
    /// [`AdapterError::Fatal`] otherwise. Either way the batch must not
    /// be partially visible.
    async fn commit_batch(
        &mut self,
        batch: &RecordBatch,
        append: bool,
    ) -> Result<CommitOutcome, AdapterError>;
}

/// Opens adapter handles for a partition. The `open(config) -> handle`
/// boundary: connection strings and codec choices stay behind it.
pub trait AdapterFactory: Send + Sync {
    /// Open the read side for `partition`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the handle cannot be opened.
    fn open_source(&self, partition: &PartitionSpec) -> Result<Box<dyn SourceAdapter>, AdapterError>;

    /// Open the write side for `partition`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the handle cannot be opened.
    fn open_target(&self, partition: &PartitionSpec) -> Result<Box<dyn TargetAdapter>, AdapterError>;
}
