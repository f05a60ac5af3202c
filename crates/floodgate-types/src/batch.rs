//! Bounded, ordered batches of records.
//!
//! A [`RecordBatch`] is a finite ordered sequence of rows sharing one
//! column set. Ownership of a batch passes stage to stage through the
//! pipeline; no stage mutates a batch another stage still holds.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::value::Value;

/// An ordered sequence of records with a common column set.
///
/// Every row holds exactly one [`Value`] per column, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordBatch {
    /// Create an empty batch with the given column set.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a batch from prebuilt rows, checking row arity.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RowArity`] if any row's length differs from
    /// the column count.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, SchemaError> {
        let mut batch = Self::new(columns);
        for row in rows {
            batch.push_row(row)?;
        }
        Ok(batch)
    }

    /// Append one row.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RowArity`] if the row's length differs from
    /// the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), SchemaError> {
        if row.len() != self.columns.len() {
            return Err(SchemaError::RowArity {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names, in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` when the batch holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Borrow all rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Borrow one cell.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is out of bounds.
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> &Value {
        &self.rows[row][col]
    }

    /// Mutable access to one cell.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is out of bounds.
    pub fn value_mut(&mut self, row: usize, col: usize) -> &mut Value {
        &mut self.rows[row][col]
    }

    /// Keep only the rows whose flag is `true`.
    ///
    /// `keep` must have one entry per row; extra entries are ignored and
    /// missing entries drop the row.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        let mut idx = 0;
        self.rows.retain(|_| {
            let kept = keep.get(idx).copied().unwrap_or(false);
            idx += 1;
            kept
        });
    }
}
