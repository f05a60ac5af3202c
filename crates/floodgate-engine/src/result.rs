//! Aggregate view over per-partition results.

use floodgate_types::partition::PartitionResult;
use serde::{Deserialize, Serialize};

/// Totals across every partition of one parallel run.
///
/// Partitions are never silently merged: the per-partition results stay
/// the source of truth, this is the roll-up for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub partitions: usize,
    pub partitions_failed: usize,
    pub rows_read: u64,
    pub rows_written: u64,
    pub rows_dropped: u64,
    pub rows_warned: u64,
    pub batches_committed: u64,
    pub batches_failed: u64,
}

impl RunTotals {
    /// Roll up a slice of partition results.
    #[must_use]
    pub fn summarize(results: &[PartitionResult]) -> Self {
        let mut totals = Self {
            partitions: results.len(),
            ..Self::default()
        };
        for r in results {
            if !r.is_success() {
                totals.partitions_failed += 1;
            }
            totals.rows_read += r.rows_read;
            totals.rows_written += r.rows_written;
            totals.rows_dropped += r.rows_dropped;
            totals.rows_warned += r.rows_warned;
            totals.batches_committed += r.batches_committed;
            totals.batches_failed += r.batches_failed;
        }
        totals
    }

    /// Returns `true` when every partition succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.partitions_failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodgate_types::partition::{PartitionId, PartitionOutcome};

    fn result(name: &str, rows: u64, failed: bool) -> PartitionResult {
        PartitionResult {
            partition: PartitionId::new(name),
            rows_read: rows,
            rows_written: if failed { 0 } else { rows },
            rows_dropped: 0,
            rows_warned: 1,
            batches_committed: u64::from(!failed),
            batches_failed: u64::from(failed),
            elapsed_secs: 0.1,
            outcome: if failed {
                PartitionOutcome::Failed {
                    error: "boom".into(),
                }
            } else {
                PartitionOutcome::Completed
            },
        }
    }

    #[test]
    fn summarize_rolls_up_counts() {
        let results = vec![result("p0", 10, false), result("p1", 5, true)];
        let totals = RunTotals::summarize(&results);

        assert_eq!(totals.partitions, 2);
        assert_eq!(totals.partitions_failed, 1);
        assert_eq!(totals.rows_read, 15);
        assert_eq!(totals.rows_written, 10);
        assert_eq!(totals.rows_warned, 2);
        assert!(!totals.all_succeeded());
    }

    #[test]
    fn empty_run_summarizes_to_zero() {
        let totals = RunTotals::summarize(&[]);
        assert_eq!(totals.partitions, 0);
        assert!(totals.all_succeeded());
    }
}
