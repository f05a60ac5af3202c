//! Per-stage observability summaries.

use serde::{Deserialize, Serialize};

/// Summary of one transformation pass over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformReport {
    /// Row-level parse/type failures converted to nulls.
    pub coercion_warnings: u64,
}

/// Rows affected by one quality rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Position of the rule in the configured list.
    pub rule_index: usize,
    /// Column the rule inspected.
    pub column: String,
    /// Short description, e.g. `"not_null:drop"`.
    pub rule: String,
    /// Rows dropped, filled, or flagged by this rule.
    pub rows_affected: u64,
}

/// Summary of one quality pass over a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    /// One entry per configured rule, in rule order.
    pub outcomes: Vec<RuleOutcome>,
    /// Rows removed from the batch.
    pub rows_dropped: u64,
    /// Values replaced in place.
    pub rows_filled: u64,
    /// Violations counted without remediation.
    pub rows_flagged: u64,
}

impl QualityReport {
    /// Returns `true` when no rule touched or flagged any row.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rows_dropped == 0 && self.rows_filled == 0 && self.rows_flagged == 0
    }
}
