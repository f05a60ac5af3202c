//! In-memory implementation of [`WatermarkStore`].
//!
//! Non-durable; for tests and runs that do not need resumption.

use std::collections::HashMap;
use std::sync::Mutex;

use floodgate_types::cursor::CursorValue;
use floodgate_types::partition::PartitionId;
use floodgate_types::state::{PipelineId, RunStats, RunStatus};

use crate::backend::WatermarkStore;
use crate::error::{self, StateError};

#[derive(Debug)]
struct RunRow {
    status: RunStatus,
    stats: RunStats,
}

/// In-memory watermark storage behind a single mutex.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    cursors: Mutex<HashMap<(PipelineId, PartitionId), CursorValue>>,
    runs: Mutex<Vec<RunRow>>,
}

impl MemoryWatermarkStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status and stats of a recorded run, if it exists.
    #[must_use]
    pub fn run(&self, run_id: i64) -> Option<(RunStatus, RunStats)> {
        let runs = self.runs.lock().ok()?;
        let idx = usize::try_from(run_id.checked_sub(1)?).ok()?;
        runs.get(idx).map(|r| (r.status, r.stats.clone()))
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn get(
        &self,
        pipeline: &PipelineId,
        partition: &PartitionId,
    ) -> error::Result<Option<CursorValue>> {
        let cursors = self.cursors.lock().map_err(|_| StateError::LockPoisoned)?;
        Ok(cursors.get(&(pipeline.clone(), partition.clone())).cloned())
    }

    fn advance(
        &self,
        pipeline: &PipelineId,
        partition: &PartitionId,
        cursor: &CursorValue,
    ) -> error::Result<CursorValue> {
        let mut cursors = self.cursors.lock().map_err(|_| StateError::LockPoisoned)?;
        let key = (pipeline.clone(), partition.clone());

        if let Some(current) = cursors.get(&key) {
            let Some(ordering) = cursor.try_cmp(current) else {
                return Err(StateError::CursorTypeMismatch {
                    stored: current.cursor_type(),
                    given: cursor.cursor_type(),
                });
            };
            if ordering != std::cmp::Ordering::Greater {
                return Ok(current.clone());
            }
        }
        cursors.insert(key, cursor.clone());
        Ok(cursor.clone())
    }

    fn start_run(&self, _pipeline: &PipelineId, _partition: &PartitionId) -> error::Result<i64> {
        let mut runs = self.runs.lock().map_err(|_| StateError::LockPoisoned)?;
        runs.push(RunRow {
            status: RunStatus::Running,
            stats: RunStats::default(),
        });
        Ok(runs.len() as i64)
    }

    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()> {
        let mut runs = self.runs.lock().map_err(|_| StateError::LockPoisoned)?;
        let idx = usize::try_from(run_id.saturating_sub(1)).unwrap_or(usize::MAX);
        if let Some(row) = runs.get_mut(idx) {
            row.status = status;
            row.stats = stats.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pid() -> PipelineId {
        PipelineId::new("p")
    }

    fn part() -> PartitionId {
        PartitionId::new("0")
    }

    #[test]
    fn empty_store_has_no_watermark() {
        let store = MemoryWatermarkStore::new();
        assert!(store.get(&pid(), &part()).unwrap().is_none());
    }

    #[test]
    fn advance_merges_to_maximum() {
        let store = MemoryWatermarkStore::new();
        store
            .advance(&pid(), &part(), &CursorValue::Int64 { value: 10 })
            .unwrap();
        let merged = store
            .advance(&pid(), &part(), &CursorValue::Int64 { value: 3 })
            .unwrap();
        assert_eq!(merged, CursorValue::Int64 { value: 10 });
    }

    #[test]
    fn concurrent_advances_store_the_maximum() {
        let store = Arc::new(MemoryWatermarkStore::new());
        let mut handles = Vec::new();

        for t in 0..8i64 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100i64 {
                    let value = (i * 8 + t) % 500;
                    store
                        .advance(&pid(), &part(), &CursorValue::Int64 { value })
                        .unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(
            store.get(&pid(), &part()).unwrap().unwrap(),
            CursorValue::Int64 { value: 499 }
        );
    }

    #[test]
    fn run_history_records_completion() {
        let store = MemoryWatermarkStore::new();
        let run_id = store.start_run(&pid(), &part()).unwrap();

        let stats = RunStats {
            rows_read: 5,
            rows_written: 5,
            rows_dropped: 0,
            error_message: None,
        };
        store
            .complete_run(run_id, RunStatus::Completed, &stats)
            .unwrap();

        let (status, got) = store.run(run_id).unwrap();
        assert_eq!(status, RunStatus::Completed);
        assert_eq!(got, stats);
    }
}
