//! Watermark store model types.
//!
//! Pure data types used by `WatermarkStore` implementations. Kept in the
//! types crate so the engine and state crates can share them without
//! circular dependencies.

use serde::{Deserialize, Serialize};

use crate::cursor::CursorType;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque pipeline identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineId(String);

impl PipelineId {
    /// Create a new pipeline identifier.
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

impl std::fmt::Display for PipelineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for PipelineId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

// ---------------------------------------------------------------------------
// Run tracking
// ---------------------------------------------------------------------------

/// Terminal status of a partition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate statistics for a completed partition run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub rows_read: u64,
    pub rows_written: u64,
    pub rows_dropped: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Watermark state
// ---------------------------------------------------------------------------

/// Snapshot of a persisted watermark for a (pipeline, partition) pair.
///
/// `updated_at` is an ISO-8601 UTC string (e.g. `"2026-01-15T10:00:00Z"`).
/// Backends handle timestamp formatting internally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkState {
    /// Type of the persisted cursor.
    pub cursor_type: CursorType,
    /// Persisted cursor value in its string form.
    pub cursor_value: String,
    /// ISO-8601 UTC timestamp of when this watermark was last written.
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_id_display_and_as_str() {
        let pid = PipelineId::new("orders-sync");
        assert_eq!(pid.as_str(), "orders-sync");
        assert_eq!(pid.to_string(), "orders-sync");
    }

    #[test]
    fn pipeline_id_eq_and_hash() {
        use std::collections::HashSet;
        let a = PipelineId::new("p1");
        let b = PipelineId::new("p1");
        assert_eq!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn run_status_as_str() {
        assert_eq!(RunStatus::Running.as_str(), "running");
        assert_eq!(RunStatus::Completed.as_str(), "completed");
        assert_eq!(RunStatus::Cancelled.as_str(), "cancelled");
        assert_eq!(RunStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn run_stats_default_is_zeroed() {
        let stats = RunStats::default();
        assert_eq!(stats.rows_read, 0);
        assert_eq!(stats.rows_written, 0);
        assert_eq!(stats.rows_dropped, 0);
        assert!(stats.error_message.is_none());
    }

    #[test]
    fn watermark_state_serde_roundtrip() {
        let ws = WatermarkState {
            cursor_type: CursorType::Int64,
            cursor_value: "42".into(),
            updated_at: "2026-01-15T10:00:00Z".into(),
        };
        let json = serde_json::to_string(&ws).unwrap();
        let back: WatermarkState = serde_json::from_str(&json).unwrap();
        assert_eq!(ws, back);
    }
}
