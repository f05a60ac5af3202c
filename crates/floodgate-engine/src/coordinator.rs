//! Parallel coordinator: fans partitions out to a bounded worker pool.
//!
//! Each partition gets an independent orchestrator run with its own
//! adapter handles; the cache and watermark store are shared. A failed
//! partition is captured in its result and never cancels siblings.

use std::sync::Arc;

use floodgate_state::WatermarkStore;
use floodgate_types::partition::{PartitionOutcome, PartitionResult, PartitionSpec};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::adapter::AdapterFactory;
use crate::cache::PassCache;
use crate::error::PipelineError;
use crate::events::EventSink;
use crate::orchestrator::{run_partition, PipelinePlan};
use crate::validate::validate_pipeline;

/// Run every partition through its own batch orchestrator on a worker
/// pool of `config.worker_count` permits.
///
/// Results come back in partition order. Partition-level failures
/// (including a panicked worker) are captured as
/// [`PartitionOutcome::Failed`]; only configuration and pool
/// infrastructure problems fail the whole run, and those surface before
/// any batch is pulled.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] when the pipeline shape is
/// invalid, or [`PipelineError::Infrastructure`] when the worker pool
/// itself breaks.
pub async fn run_parallel(
    plan: Arc<PipelinePlan>,
    partitions: Vec<PartitionSpec>,
    factory: Arc<dyn AdapterFactory>,
    store: Arc<dyn WatermarkStore>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
) -> Result<Vec<PartitionResult>, PipelineError> {
    validate_pipeline(&plan.config, &plan.mapping, &plan.ops, &plan.rules)?;

    let cache = Arc::new(PassCache::new(plan.config.cache_enabled));
    let semaphore = Arc::new(Semaphore::new(plan.config.worker_count));

    tracing::info!(
        pipeline = plan.config.pipeline,
        partitions = partitions.len(),
        workers = plan.config.worker_count,
        cache_enabled = plan.config.cache_enabled,
        "Starting partition-parallel run"
    );

    let mut handles = Vec::with_capacity(partitions.len());
    for spec in partitions {
        let permit = semaphore.clone().acquire_owned().await.map_err(|e| {
            PipelineError::Infrastructure(anyhow::anyhow!("worker pool semaphore closed: {e}"))
        })?;

        let plan = plan.clone();
        let factory = factory.clone();
        let store = store.clone();
        let cache = cache.clone();
        let sink = sink.clone();
        let cancel = cancel.clone();
        let partition_id = spec.id.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;

            let source = match factory.open_source(&spec) {
                Ok(source) => source,
                Err(err) => return open_failure(&spec, "source", &err),
            };
            let target = match factory.open_target(&spec) {
                Ok(target) => target,
                Err(err) => return open_failure(&spec, "target", &err),
            };

            run_partition(&plan, &spec, source, target, store, cache, sink, cancel).await
        });
        handles.push((partition_id, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (partition_id, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(join_err) => {
                tracing::error!(
                    partition = partition_id.as_str(),
                    "Partition task panicked: {join_err}"
                );
                results.push(PartitionResult {
                    partition: partition_id,
                    rows_read: 0,
                    rows_written: 0,
                    rows_dropped: 0,
                    rows_warned: 0,
                    batches_committed: 0,
                    batches_failed: 0,
                    elapsed_secs: 0.0,
                    outcome: PartitionOutcome::Failed {
                        error: format!("partition task panicked: {join_err}"),
                    },
                });
            }
        }
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    tracing::info!(
        pipeline = plan.config.pipeline,
        partitions = results.len(),
        failed,
        rows_written = results.iter().map(|r| r.rows_written).sum::<u64>(),
        "Partition-parallel run finished"
    );

    Ok(results)
}

fn open_failure(
    spec: &PartitionSpec,
    side: &str,
    err: &crate::adapter::AdapterError,
) -> PartitionResult {
    tracing::error!(
        partition = spec.id.as_str(),
        side,
        error = %err,
        "Failed to open adapter"
    );
    PartitionResult {
        partition: spec.id.clone(),
        rows_read: 0,
        rows_written: 0,
        rows_dropped: 0,
        rows_warned: 0,
        batches_committed: 0,
        batches_failed: 0,
        elapsed_secs: 0.0,
        outcome: PartitionOutcome::Failed {
            error: format!("failed to open {side} adapter: {err}"),
        },
    }
}
