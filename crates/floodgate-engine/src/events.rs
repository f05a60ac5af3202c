//! Structured observability events.
//!
//! The orchestrator reports progress through an injected [`EventSink`]
//! rather than a process-global logger; subscriber setup stays outside
//! the core. [`TracingSink`] bridges events onto `tracing` for hosts
//! that want exactly that.

use floodgate_types::cursor::CursorValue;
use floodgate_types::partition::{PartitionId, PartitionOutcome};

/// Pipeline stage a batch has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Pulled,
    Mapped,
    Transformed,
    QualityChecked,
    Committed,
    Failed,
}

impl BatchStage {
    /// Short name for logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pulled => "pulled",
            Self::Mapped => "mapped",
            Self::Transformed => "transformed",
            Self::QualityChecked => "quality_checked",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }
}

/// One structured progress event.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A batch arrived from the source.
    BatchPulled {
        partition: PartitionId,
        batch_index: u64,
        rows: usize,
    },
    /// The transformation+quality pass was served from the cache.
    CacheHit {
        partition: PartitionId,
        batch_index: u64,
        fingerprint: String,
    },
    /// A batch moved through a pipeline stage.
    StageReached {
        partition: PartitionId,
        batch_index: u64,
        stage: BatchStage,
        rows: usize,
    },
    /// A commit attempt failed and will be retried after `delay_ms`.
    CommitRetry {
        partition: PartitionId,
        batch_index: u64,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    /// A batch was durably committed.
    BatchCommitted {
        partition: PartitionId,
        batch_index: u64,
        rows_written: u64,
    },
    /// A batch was abandoned (schema fault or exhausted retries).
    BatchFailed {
        partition: PartitionId,
        batch_index: u64,
        error: String,
    },
    /// The stored watermark moved forward.
    WatermarkAdvanced {
        partition: PartitionId,
        cursor: CursorValue,
    },
    /// A partition run reached its terminal state.
    PartitionFinished {
        partition: PartitionId,
        outcome: PartitionOutcome,
        rows_read: u64,
        rows_written: u64,
    },
}

/// Structured event callback injected into the orchestrator.
pub trait EventSink: Send + Sync {
    /// Receive one event. Must not block for long; the orchestrator
    /// calls this inline.
    fn emit(&self, event: &PipelineEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &PipelineEvent) {}
}

/// Sink that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::BatchPulled {
                partition,
                batch_index,
                rows,
            } => {
                tracing::debug!(
                    partition = partition.as_str(),
                    batch_index,
                    rows,
                    "Batch pulled"
                );
            }
            PipelineEvent::CacheHit {
                partition,
                batch_index,
                fingerprint,
            } => {
                tracing::debug!(
                    partition = partition.as_str(),
                    batch_index,
                    fingerprint,
                    "Cache hit, skipping transform and quality stages"
                );
            }
            PipelineEvent::StageReached {
                partition,
                batch_index,
                stage,
                rows,
            } => {
                tracing::trace!(
                    partition = partition.as_str(),
                    batch_index,
                    stage = stage.as_str(),
                    rows,
                    "Stage reached"
                );
            }
            PipelineEvent::CommitRetry {
                partition,
                batch_index,
                attempt,
                delay_ms,
                error,
            } => {
                tracing::warn!(
                    partition = partition.as_str(),
                    batch_index,
                    attempt,
                    delay_ms,
                    error,
                    "Commit failed, will retry"
                );
            }
            PipelineEvent::BatchCommitted {
                partition,
                batch_index,
                rows_written,
            } => {
                tracing::info!(
                    partition = partition.as_str(),
                    batch_index,
                    rows_written,
                    "Batch committed"
                );
            }
            PipelineEvent::BatchFailed {
                partition,
                batch_index,
                error,
            } => {
                tracing::error!(
                    partition = partition.as_str(),
                    batch_index,
                    error,
                    "Batch failed"
                );
            }
            PipelineEvent::WatermarkAdvanced { partition, cursor } => {
                tracing::info!(
                    partition = partition.as_str(),
                    cursor = cursor.as_storage(),
                    "Watermark advanced"
                );
            }
            PipelineEvent::PartitionFinished {
                partition,
                outcome,
                rows_read,
                rows_written,
            } => {
                tracing::info!(
                    partition = partition.as_str(),
                    outcome = ?outcome,
                    rows_read,
                    rows_written,
                    "Partition finished"
                );
            }
        }
    }
}
