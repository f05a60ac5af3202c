//! Schema mapper: renames and selects columns.

use floodgate_types::batch::RecordBatch;
use floodgate_types::error::SchemaError;
use floodgate_types::mapping::ColumnMapping;
use floodgate_types::value::Value;

/// Remap `batch` onto the mapping's target columns.
///
/// Output columns are the mapping's targets in mapping order; every row
/// copies the value of the named source column. Source columns not
/// referenced by the mapping are dropped. Pure function of its inputs.
///
/// # Errors
///
/// Returns [`SchemaError::MissingColumn`] when a required entry's source
/// column is absent from the batch. Optional entries with an absent
/// source yield an all-null target column.
pub fn map(batch: RecordBatch, mapping: &ColumnMapping) -> Result<RecordBatch, SchemaError> {
    // Resolve every source index up front so a missing required column
    // fails before any row work.
    let mut source_indices = Vec::with_capacity(mapping.entries().len());
    for spec in mapping.entries() {
        match batch.column_index(&spec.source) {
            Some(idx) => source_indices.push(Some(idx)),
            None if spec.optional => source_indices.push(None),
            None => {
                return Err(SchemaError::MissingColumn {
                    column: spec.source.clone(),
                })
            }
        }
    }

    let columns: Vec<String> = mapping
        .entries()
        .iter()
        .map(|spec| spec.target.clone())
        .collect();

    let mut out = RecordBatch::new(columns);
    for row in batch.rows() {
        let mapped: Vec<Value> = source_indices
            .iter()
            .map(|idx| idx.map_or(Value::Null, |i| row[i].clone()))
            .collect();
        out.push_row(mapped)?;
    }
    Ok(out)
}
