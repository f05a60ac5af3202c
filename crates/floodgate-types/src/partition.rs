//! Partition identity and per-partition run outcomes.

use serde::{Deserialize, Serialize};

/// Opaque partition identifier (e.g. a file name or date range label).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    /// Create a new partition identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PartitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for PartitionId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

/// One independently processable slice of the workload.
///
/// `selector` is opaque to the engine; adapters interpret it when
/// opening their handles (a path, a date range, a shard predicate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSpec {
    /// Identifier reported back in the [`PartitionResult`].
    pub id: PartitionId,
    /// Adapter-interpreted slice description.
    #[serde(default)]
    pub selector: serde_json::Value,
}

impl PartitionSpec {
    /// Partition with no selector payload.
    #[must_use]
    pub fn new(id: impl Into<PartitionId>) -> Self {
        Self {
            id: id.into(),
            selector: serde_json::Value::Null,
        }
    }
}

/// How a partition run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PartitionOutcome {
    /// Source exhausted, every batch committed.
    Completed,
    /// Stopped cleanly at a batch boundary by the cancellation signal.
    Cancelled,
    /// Aborted; `error` carries the failure detail.
    Failed { error: String },
}

/// Immutable per-partition outcome produced by the parallel coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionResult {
    /// Which partition this result describes.
    pub partition: PartitionId,
    /// Rows pulled from the source.
    pub rows_read: u64,
    /// Rows committed to the target.
    pub rows_written: u64,
    /// Rows removed by quality rules.
    pub rows_dropped: u64,
    /// Row-level coercion warnings raised by the transformation engine.
    pub rows_warned: u64,
    /// Batches committed to the target.
    pub batches_committed: u64,
    /// Batches that failed (schema faults or exhausted commit retries).
    pub batches_failed: u64,
    /// Wall-clock duration of the partition run.
    pub elapsed_secs: f64,
    /// Terminal outcome.
    pub outcome: PartitionOutcome,
}

impl PartitionResult {
    /// Returns `true` unless the partition failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, PartitionOutcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serde_format() {
        let json = serde_json::to_value(&PartitionOutcome::Failed {
            error: "commit failed".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"outcome": "failed", "error": "commit failed"})
        );
    }

    #[test]
    fn success_classification() {
        let mut result = PartitionResult {
            partition: PartitionId::new("p0"),
            rows_read: 10,
            rows_written: 9,
            rows_dropped: 1,
            rows_warned: 0,
            batches_committed: 1,
            batches_failed: 0,
            elapsed_secs: 0.5,
            outcome: PartitionOutcome::Completed,
        };
        assert!(result.is_success());

        result.outcome = PartitionOutcome::Cancelled;
        assert!(result.is_success());

        result.outcome = PartitionOutcome::Failed { error: "x".into() };
        assert!(!result.is_success());
    }

    #[test]
    fn partition_spec_defaults_selector_to_null() {
        let spec = PartitionSpec::new("2026-01-15");
        assert_eq!(spec.selector, serde_json::Value::Null);
        let json = serde_json::to_string(&spec).unwrap();
        let back: PartitionSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
