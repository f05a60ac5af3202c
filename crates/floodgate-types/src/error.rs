//! Typed error taxonomy shared across crates.
//!
//! Row-level coercion failures are not errors; they become nulls plus
//! counted warnings inside the transformation engine. The types here
//! cover batch-fatal schema faults and run-fatal configuration faults.

/// Missing or mismatched columns. Fatal to the batch, not the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A required source column is absent from the batch.
    #[error("source column '{column}' is missing from the batch")]
    MissingColumn { column: String },

    /// A transform or quality rule targets a column the batch does not have.
    #[error("column '{column}' not found in batch")]
    UnknownColumn { column: String },

    /// A row's value count does not match the batch column count.
    #[error("row has {got} values but the batch has {expected} columns")]
    RowArity { expected: usize, got: usize },
}

/// Malformed configuration, mapping, or rule parameters.
///
/// Fatal to the run; raised at pipeline construction, before any batch
/// is pulled. Collects every problem found so misconfiguration surfaces
/// in one pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("pipeline validation failed:\n  - {}", .problems.join("\n  - "))]
pub struct ValidationError {
    /// Human-readable description of each problem found.
    pub problems: Vec<String>,
}

impl ValidationError {
    /// Wrap a single problem.
    #[must_use]
    pub fn single(problem: impl Into<String>) -> Self {
        Self {
            problems: vec![problem.into()],
        }
    }
}

/// A persisted cursor string that does not parse as its stored type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {cursor_type} cursor value '{raw}'")]
pub struct CursorParseError {
    /// The cursor type the store claims.
    pub cursor_type: String,
    /// The raw stored string.
    pub raw: String,
}
