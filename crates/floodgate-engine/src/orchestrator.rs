//! Batch orchestrator: drives one partition through pull, map,
//! transform, quality, commit, and watermark advancement.
//!
//! Per-batch state machine: pulled → mapped → transformed →
//! quality-checked → committed, or failed at any stage. Within one
//! partition batches are processed and committed strictly in pull
//! order. The watermark advances only after a confirmed commit and
//! never regresses.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use floodgate_state::WatermarkStore;
use floodgate_types::batch::RecordBatch;
use floodgate_types::config::PipelineConfig;
use floodgate_types::cursor::CursorValue;
use floodgate_types::mapping::ColumnMapping;
use floodgate_types::partition::{PartitionId, PartitionOutcome, PartitionResult, PartitionSpec};
use floodgate_types::quality::QualityRule;
use floodgate_types::state::{PipelineId, RunStats, RunStatus};
use floodgate_types::transform::TransformOp;
use tokio_util::sync::CancellationToken;

use crate::adapter::{CommitOutcome, SourceAdapter, SourcePull, TargetAdapter};
use crate::cache::{PassCache, PassOutput};
use crate::error::{compute_backoff, PipelineError};
use crate::events::{BatchStage, EventSink, PipelineEvent};
use crate::fingerprint::batch_fingerprint;
use crate::{mapper, quality, transform};

/// Immutable pipeline shape shared by every partition worker.
pub struct PipelinePlan {
    pub config: PipelineConfig,
    pub mapping: ColumnMapping,
    pub ops: Vec<TransformOp>,
    pub rules: Vec<QualityRule>,
}

#[derive(Debug, Default)]
struct Counters {
    rows_read: u64,
    rows_written: u64,
    rows_dropped: u64,
    rows_warned: u64,
    batches_committed: u64,
    batches_failed: u64,
}

/// Run one partition to completion.
///
/// Never returns an error: every failure mode ends up in the
/// [`PartitionResult`]'s outcome so sibling partitions are unaffected.
#[allow(clippy::too_many_arguments)]
pub async fn run_partition(
    plan: &PipelinePlan,
    spec: &PartitionSpec,
    mut source: Box<dyn SourceAdapter>,
    mut target: Box<dyn TargetAdapter>,
    store: Arc<dyn WatermarkStore>,
    cache: Arc<PassCache>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
) -> PartitionResult {
    let started = Instant::now();
    let pipeline = PipelineId::new(plan.config.pipeline.clone());
    let partition = spec.id.clone();
    let mut counters = Counters::default();

    tracing::info!(
        pipeline = pipeline.as_str(),
        partition = partition.as_str(),
        incremental = plan.config.incremental,
        "Starting partition run"
    );

    let run_id = store_start_run(&store, &pipeline, &partition).await;

    let outcome = match drive(
        plan,
        &pipeline,
        &partition,
        &mut source,
        &mut target,
        &store,
        &cache,
        &sink,
        &cancel,
        &mut counters,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => PartitionOutcome::Failed {
            error: err.to_string(),
        },
    };

    finish_run(&store, run_id, &outcome, &counters).await;

    sink.emit(&PipelineEvent::PartitionFinished {
        partition: partition.clone(),
        outcome: outcome.clone(),
        rows_read: counters.rows_read,
        rows_written: counters.rows_written,
    });

    PartitionResult {
        partition,
        rows_read: counters.rows_read,
        rows_written: counters.rows_written,
        rows_dropped: counters.rows_dropped,
        rows_warned: counters.rows_warned,
        batches_committed: counters.batches_committed,
        batches_failed: counters.batches_failed,
        elapsed_secs: started.elapsed().as_secs_f64(),
        outcome,
    }
}

/// The pull/process/commit loop. Schema faults fail only the current
/// batch; everything else ends the partition.
#[allow(clippy::too_many_arguments)]
async fn drive(
    plan: &PipelinePlan,
    pipeline: &PipelineId,
    partition: &PartitionId,
    source: &mut Box<dyn SourceAdapter>,
    target: &mut Box<dyn TargetAdapter>,
    store: &Arc<dyn WatermarkStore>,
    cache: &Arc<PassCache>,
    sink: &Arc<dyn EventSink>,
    cancel: &CancellationToken,
    counters: &mut Counters,
) -> Result<PartitionOutcome, PipelineError> {
    let since = if plan.config.incremental {
        store_get(store, pipeline, partition).await?
    } else {
        None
    };

    let mut batch_index: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            tracing::info!(
                partition = partition.as_str(),
                "Cancellation observed at batch boundary"
            );
            return Ok(PartitionOutcome::Cancelled);
        }

        let pull = pull_with_retry(plan, source, since.as_ref()).await?;
        let rows = pull.batch.num_rows();
        counters.rows_read += rows as u64;
        sink.emit(&PipelineEvent::BatchPulled {
            partition: partition.clone(),
            batch_index,
            rows,
        });

        if !pull.batch.is_empty() {
            let result = process_and_commit(
                plan,
                pipeline,
                partition,
                pull.batch,
                batch_index,
                target,
                store,
                cache,
                sink,
                counters,
            )
            .await;

            match result {
                Ok(()) => {}
                Err(err) if err.is_batch_fatal_only() => {
                    counters.batches_failed += 1;
                    sink.emit(&PipelineEvent::BatchFailed {
                        partition: partition.clone(),
                        batch_index,
                        error: err.to_string(),
                    });
                }
                Err(err) => {
                    counters.batches_failed += 1;
                    sink.emit(&PipelineEvent::BatchFailed {
                        partition: partition.clone(),
                        batch_index,
                        error: err.to_string(),
                    });
                    return Err(err);
                }
            }
        }

        if pull.exhausted {
            return Ok(PartitionOutcome::Completed);
        }
        batch_index += 1;
    }
}

/// Map, transform, and quality-check one batch under the cache's
/// single-flight guard, then commit it and advance the watermark.
#[allow(clippy::too_many_arguments)]
async fn process_and_commit(
    plan: &PipelinePlan,
    pipeline: &PipelineId,
    partition: &PartitionId,
    batch: RecordBatch,
    batch_index: u64,
    target: &mut Box<dyn TargetAdapter>,
    store: &Arc<dyn WatermarkStore>,
    cache: &Arc<PassCache>,
    sink: &Arc<dyn EventSink>,
    counters: &mut Counters,
) -> Result<(), PipelineError> {
    let fingerprint = batch_fingerprint(&batch, &plan.mapping, &plan.ops, &plan.rules);

    let (output, cache_hit) = cache
        .get_or_compute(&fingerprint, || async {
            let mapped = mapper::map(batch, &plan.mapping)?;
            sink.emit(&PipelineEvent::StageReached {
                partition: partition.clone(),
                batch_index,
                stage: BatchStage::Mapped,
                rows: mapped.num_rows(),
            });

            let (transformed, transform_report) = transform::apply(mapped, &plan.ops)?;
            sink.emit(&PipelineEvent::StageReached {
                partition: partition.clone(),
                batch_index,
                stage: BatchStage::Transformed,
                rows: transformed.num_rows(),
            });

            let (checked, quality_report) = quality::enforce(transformed, &plan.rules)?;
            sink.emit(&PipelineEvent::StageReached {
                partition: partition.clone(),
                batch_index,
                stage: BatchStage::QualityChecked,
                rows: checked.num_rows(),
            });

            Ok(PassOutput {
                batch: checked,
                transform: transform_report,
                quality: quality_report,
            })
        })
        .await?;

    if cache_hit {
        sink.emit(&PipelineEvent::CacheHit {
            partition: partition.clone(),
            batch_index,
            fingerprint,
        });
    }

    counters.rows_dropped += output.quality.rows_dropped;
    counters.rows_warned += output.transform.coercion_warnings;

    // Quality rules may have dropped every row; nothing to commit and
    // no cursor to observe.
    if output.batch.is_empty() {
        counters.batches_committed += 1;
        sink.emit(&PipelineEvent::BatchCommitted {
            partition: partition.clone(),
            batch_index,
            rows_written: 0,
        });
        return Ok(());
    }

    let commit = commit_with_retry(plan, partition, target, &output.batch, batch_index, sink).await
        .map_err(|err| {
            // The target never saw the batch, or refused it whole; the
            // watermark stays put so a rerun re-pulls these rows.
            tracing::error!(
                partition = partition.as_str(),
                batch_index,
                error = %err,
                "Batch commit failed after exhausting retries"
            );
            err
        })?;

    counters.rows_written += commit.rows_written;
    counters.batches_committed += 1;
    sink.emit(&PipelineEvent::BatchCommitted {
        partition: partition.clone(),
        batch_index,
        rows_written: commit.rows_written,
    });

    if plan.config.incremental {
        if let Some(column) = &plan.config.watermark_column {
            if let Some(cursor) = max_cursor(&output.batch, column) {
                let merged = store_advance(store, pipeline, partition, &cursor).await?;
                sink.emit(&PipelineEvent::WatermarkAdvanced {
                    partition: partition.clone(),
                    cursor: merged,
                });
            }
        }
    }

    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
async fn pull_with_retry(
    plan: &PipelinePlan,
    source: &mut Box<dyn SourceAdapter>,
    since: Option<&CursorValue>,
) -> Result<SourcePull, PipelineError> {
    let policy = &plan.config.retry;
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match source.pull_batch(plan.config.batch_size, since).await {
            Ok(pull) => return Ok(pull),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = compute_backoff(policy, attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Source pull failed, will retry"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Commit with the configured timeout and retry bound. A timeout counts
/// as a transient commit failure.
#[allow(clippy::cast_possible_truncation)]
async fn commit_with_retry(
    plan: &PipelinePlan,
    partition: &PartitionId,
    target: &mut Box<dyn TargetAdapter>,
    batch: &RecordBatch,
    batch_index: u64,
    sink: &Arc<dyn EventSink>,
) -> Result<CommitOutcome, PipelineError> {
    let policy = &plan.config.retry;
    let timeout = Duration::from_millis(plan.config.commit_timeout_ms);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let attempt_result =
            tokio::time::timeout(timeout, target.commit_batch(batch, plan.config.append)).await;

        let err: PipelineError = match attempt_result {
            Ok(Ok(outcome)) => return Ok(outcome),
            Ok(Err(err)) if !err.is_transient() => return Err(err.into()),
            Ok(Err(err)) => err.into(),
            Err(_) => PipelineError::Transient(format!(
                "commit timed out after {}ms",
                plan.config.commit_timeout_ms
            )),
        };

        if attempt >= policy.max_attempts {
            return Err(err);
        }
        let delay = compute_backoff(policy, attempt);
        sink.emit(&PipelineEvent::CommitRetry {
            partition: partition.clone(),
            batch_index,
            attempt,
            delay_ms: delay.as_millis() as u64,
            error: err.to_string(),
        });
        tokio::time::sleep(delay).await;
    }
}

/// Maximum cursor value observed in `column`, ignoring nulls and
/// non-cursor cells.
fn max_cursor(batch: &RecordBatch, column: &str) -> Option<CursorValue> {
    let col = batch.column_index(column)?;
    let mut max: Option<CursorValue> = None;
    for row in batch.rows() {
        let Some(candidate) = CursorValue::from_value(&row[col]) else {
            continue;
        };
        max = match max {
            None => Some(candidate),
            Some(current) => {
                if candidate.try_cmp(&current) == Some(Ordering::Greater) {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    max
}

// ---------------------------------------------------------------------------
// Blocking watermark-store calls, bridged off the async workers.
// ---------------------------------------------------------------------------

async fn store_get(
    store: &Arc<dyn WatermarkStore>,
    pipeline: &PipelineId,
    partition: &PartitionId,
) -> Result<Option<CursorValue>, PipelineError> {
    let store = store.clone();
    let pipeline = pipeline.clone();
    let partition = partition.clone();
    tokio::task::spawn_blocking(move || store.get(&pipeline, &partition))
        .await
        .map_err(|e| {
            PipelineError::Infrastructure(anyhow::anyhow!("watermark get task panicked: {e}"))
        })?
        .map_err(Into::into)
}

async fn store_advance(
    store: &Arc<dyn WatermarkStore>,
    pipeline: &PipelineId,
    partition: &PartitionId,
    cursor: &CursorValue,
) -> Result<CursorValue, PipelineError> {
    let store = store.clone();
    let pipeline = pipeline.clone();
    let partition = partition.clone();
    let cursor = cursor.clone();
    tokio::task::spawn_blocking(move || store.advance(&pipeline, &partition, &cursor))
        .await
        .map_err(|e| {
            PipelineError::Infrastructure(anyhow::anyhow!("watermark advance task panicked: {e}"))
        })?
        .map_err(Into::into)
}

/// Run-history bookkeeping is best-effort: a store hiccup must not fail
/// a partition that moved data correctly.
async fn store_start_run(
    store: &Arc<dyn WatermarkStore>,
    pipeline: &PipelineId,
    partition: &PartitionId,
) -> Option<i64> {
    let store = store.clone();
    let pipeline = pipeline.clone();
    let partition = partition.clone();
    let joined =
        tokio::task::spawn_blocking(move || store.start_run(&pipeline, &partition)).await;
    match joined {
        Ok(Ok(run_id)) => Some(run_id),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "Failed to record run start");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "Run-start task panicked");
            None
        }
    }
}

async fn finish_run(
    store: &Arc<dyn WatermarkStore>,
    run_id: Option<i64>,
    outcome: &PartitionOutcome,
    counters: &Counters,
) {
    let Some(run_id) = run_id else { return };
    let status = match outcome {
        PartitionOutcome::Completed => RunStatus::Completed,
        PartitionOutcome::Cancelled => RunStatus::Cancelled,
        PartitionOutcome::Failed { .. } => RunStatus::Failed,
    };
    let stats = RunStats {
        rows_read: counters.rows_read,
        rows_written: counters.rows_written,
        rows_dropped: counters.rows_dropped,
        error_message: match outcome {
            PartitionOutcome::Failed { error } => Some(error.clone()),
            _ => None,
        },
    };
    let store = store.clone();
    let joined =
        tokio::task::spawn_blocking(move || store.complete_run(run_id, status, &stats)).await;
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, "Failed to record run completion"),
        Err(err) => tracing::warn!(error = %err, "Run-completion task panicked"),
    }
}
