//! Watermark store trait definition.
//!
//! [`WatermarkStore`] defines the storage contract for incremental
//! cursors and partition run history. Model types live in
//! [`floodgate_types::state`].

use floodgate_types::cursor::CursorValue;
use floodgate_types::partition::PartitionId;
use floodgate_types::state::{PipelineId, RunStats, RunStatus};

use crate::error;

/// Storage contract for watermarks and run history.
///
/// Implementations must be `Send + Sync` for use behind
/// `Arc<dyn WatermarkStore>` across partition workers. `advance` must be
/// a read-modify-write critical section per (pipeline, partition)
/// identity: under concurrent calls the stored cursor is always the
/// maximum ever passed, never a blind overwrite.
pub trait WatermarkStore: Send + Sync {
    /// Read the current watermark for a (pipeline, partition) pair.
    ///
    /// Returns `Ok(None)` when no watermark has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage
    /// failure or when the persisted value is corrupt.
    fn get(
        &self,
        pipeline: &PipelineId,
        partition: &PartitionId,
    ) -> error::Result<Option<CursorValue>>;

    /// Monotonically merge `cursor` into the stored watermark.
    ///
    /// Stores `cursor` only when it exceeds the current value (or none is
    /// stored); returns the stored value after the merge. The watermark
    /// never regresses.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::CursorTypeMismatch`](crate::error::StateError)
    /// when `cursor`'s type differs from the stored one, or a storage
    /// error.
    fn advance(
        &self,
        pipeline: &PipelineId,
        partition: &PartitionId,
        cursor: &CursorValue,
    ) -> error::Result<CursorValue>;

    /// Begin a new partition run, returning its unique ID.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn start_run(&self, pipeline: &PipelineId, partition: &PartitionId) -> error::Result<i64>;

    /// Finalize a partition run with status and aggregate stats.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()>;
}
