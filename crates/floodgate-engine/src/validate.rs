//! Eager semantic validation for pipeline construction.
//!
//! Everything here runs before any batch is pulled; a failure is fatal
//! to the run. All problems are collected into one [`ValidationError`]
//! so misconfiguration surfaces in a single pass.

use std::collections::{HashMap, HashSet};

use floodgate_types::config::PipelineConfig;
use floodgate_types::error::ValidationError;
use floodgate_types::mapping::ColumnMapping;
use floodgate_types::quality::QualityRule;
use floodgate_types::transform::TransformOp;

/// Validate the full pipeline shape: config, mapping, ops, and rules.
///
/// # Errors
///
/// Returns [`ValidationError`] listing every problem found.
pub fn validate_pipeline(
    config: &PipelineConfig,
    mapping: &ColumnMapping,
    ops: &[TransformOp],
    rules: &[QualityRule],
) -> Result<(), ValidationError> {
    let mut problems = Vec::new();

    if config.pipeline.trim().is_empty() {
        problems.push("pipeline name must not be empty".to_string());
    }
    if config.batch_size == 0 {
        problems.push("batch_size must be positive".to_string());
    }
    if config.worker_count == 0 {
        problems.push("worker_count must be positive".to_string());
    }
    if config.retry.max_attempts == 0 {
        problems.push("retry.max_attempts must be at least 1".to_string());
    }
    if config.commit_timeout_ms == 0 {
        problems.push("commit_timeout_ms must be positive".to_string());
    }

    let targets: HashSet<&str> = mapping
        .entries()
        .iter()
        .map(|spec| spec.target.as_str())
        .collect();

    if config.incremental {
        match &config.watermark_column {
            None => problems.push(
                "incremental mode requires a watermark_column".to_string(),
            ),
            Some(column) if !targets.contains(column.as_str()) => problems.push(format!(
                "watermark_column '{column}' is not a mapped target column"
            )),
            Some(_) => {}
        }
    }

    for op in ops {
        if !targets.contains(op.column.as_str()) {
            problems.push(format!(
                "transform op {:?} targets unmapped column '{}'",
                op.kind, op.column
            ));
        }
    }

    for rule in rules {
        if !targets.contains(rule.column.as_str()) {
            problems.push(format!(
                "quality rule on unmapped column '{}'",
                rule.column
            ));
        }
        if let Err(err) = rule.validate() {
            problems.extend(err.problems);
        }
    }

    warn_on_conflicting_rules(rules);

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { problems })
    }
}

/// Multiple rules on one column apply strictly in configured order.
/// That is well-defined but easy to misread (a fill followed by a
/// range-drop can remove the filled value), so surface it.
fn warn_on_conflicting_rules(rules: &[QualityRule]) {
    let mut by_column: HashMap<&str, usize> = HashMap::new();
    for rule in rules {
        *by_column.entry(rule.column.as_str()).or_default() += 1;
    }
    for (column, count) in by_column {
        if count > 1 {
            tracing::warn!(
                column,
                rules = count,
                "multiple quality rules target one column; they apply strictly in configured order"
            );
        }
    }
}
