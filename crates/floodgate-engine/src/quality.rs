//! Data quality engine: ordered validation rules with remediation.
//!
//! Rules never abort a batch. Violations are remediated according to the
//! rule's action, and the report carries per-rule counts for
//! observability. A dropped row is gone for every later rule and for the
//! output.

use std::cmp::Ordering;
use std::collections::HashSet;

use floodgate_types::batch::RecordBatch;
use floodgate_types::error::SchemaError;
use floodgate_types::quality::{QualityRule, RuleAction, RuleKind};
use floodgate_types::report::{QualityReport, RuleOutcome};
use floodgate_types::value::Value;

/// Apply `rules` in list order against `batch`.
///
/// Re-running the result through the same rules removes and fills
/// nothing further (idempotence); flag-only rules may report again.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownColumn`] when a rule targets a column
/// the batch does not have.
pub fn enforce(
    mut batch: RecordBatch,
    rules: &[QualityRule],
) -> Result<(RecordBatch, QualityReport), SchemaError> {
    let mut report = QualityReport::default();

    for (rule_index, rule) in rules.iter().enumerate() {
        let col = batch
            .column_index(&rule.column)
            .ok_or_else(|| SchemaError::UnknownColumn {
                column: rule.column.clone(),
            })?;

        let rows_affected = match (&rule.kind, &rule.action) {
            (RuleKind::NotNull, RuleAction::DropRow) => {
                let dropped = drop_rows(&mut batch, |row| row[col].is_null());
                report.rows_dropped += dropped;
                dropped
            }
            (RuleKind::NotNull, RuleAction::FillValue { value }) => {
                let mut filled = 0u64;
                for row in 0..batch.num_rows() {
                    if batch.value(row, col).is_null() {
                        *batch.value_mut(row, col) = value.clone();
                        filled += 1;
                    }
                }
                report.rows_filled += filled;
                filled
            }
            (RuleKind::NotNull, RuleAction::Flag) => {
                let flagged = count_rows(&batch, |row| row[col].is_null());
                report.rows_flagged += flagged;
                flagged
            }
            (RuleKind::Range { min, max }, RuleAction::DropRow) => {
                let dropped = drop_rows(&mut batch, |row| out_of_range(&row[col], min, max));
                report.rows_dropped += dropped;
                dropped
            }
            (RuleKind::Range { min, max }, RuleAction::Flag) => {
                let flagged = count_rows(&batch, |row| out_of_range(&row[col], min, max));
                report.rows_flagged += flagged;
                flagged
            }
            (RuleKind::Unique, RuleAction::DropDuplicates) => {
                let mut seen = HashSet::new();
                let keep: Vec<bool> = batch
                    .rows()
                    .iter()
                    .map(|row| seen.insert(row[col].canonical_token()))
                    .collect();
                let dropped = keep.iter().filter(|k| !**k).count() as u64;
                batch.retain_rows(&keep);
                report.rows_dropped += dropped;
                dropped
            }
            // Invalid pairs are rejected by eager validation; treat a
            // slipped-through one as affecting nothing.
            _ => 0,
        };

        report.outcomes.push(RuleOutcome {
            rule_index,
            column: rule.column.clone(),
            rule: rule_label(rule),
            rows_affected,
        });
    }

    Ok((batch, report))
}

/// A value violates `[min, max]` when it is null, incomparable with the
/// bounds, or ordered outside them.
fn out_of_range(value: &Value, min: &Value, max: &Value) -> bool {
    if value.is_null() {
        return true;
    }
    let Some(vs_min) = value.try_cmp(min) else {
        return true;
    };
    let Some(vs_max) = value.try_cmp(max) else {
        return true;
    };
    vs_min == Ordering::Less || vs_max == Ordering::Greater
}

fn drop_rows(batch: &mut RecordBatch, violates: impl Fn(&[Value]) -> bool) -> u64 {
    let keep: Vec<bool> = batch.rows().iter().map(|row| !violates(row)).collect();
    let dropped = keep.iter().filter(|k| !**k).count() as u64;
    batch.retain_rows(&keep);
    dropped
}

fn count_rows(batch: &RecordBatch, violates: impl Fn(&[Value]) -> bool) -> u64 {
    batch.rows().iter().filter(|row| violates(row)).count() as u64
}

fn rule_label(rule: &QualityRule) -> String {
    let kind = match &rule.kind {
        RuleKind::NotNull => "not_null",
        RuleKind::Range { .. } => "range",
        RuleKind::Unique => "unique",
    };
    let action = match &rule.action {
        RuleAction::DropRow => "drop",
        RuleAction::FillValue { .. } => "fill",
        RuleAction::Flag => "flag",
        RuleAction::DropDuplicates => "drop_duplicates",
    };
    format!("{kind}:{action}")
}
