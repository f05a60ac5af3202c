//! Transformation engine: ordered per-column operations.
//!
//! Row-level coercion failures never abort a batch: the offending value
//! becomes null and the report counts one warning. Output is a pure
//! function of the input batch and op list.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use floodgate_types::batch::RecordBatch;
use floodgate_types::error::SchemaError;
use floodgate_types::report::TransformReport;
use floodgate_types::transform::{TransformKind, TransformOp};
use floodgate_types::value::Value;

/// Datetime fallbacks tried after RFC 3339.
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

/// Apply `ops` in list order across every row.
///
/// Later ops observe earlier ops' effects on the same or other columns.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownColumn`] when an op targets a column
/// the batch does not have; coercion failures are warnings, not errors.
pub fn apply(
    mut batch: RecordBatch,
    ops: &[TransformOp],
) -> Result<(RecordBatch, TransformReport), SchemaError> {
    let mut report = TransformReport::default();

    for op in ops {
        let col = batch
            .column_index(&op.column)
            .ok_or_else(|| SchemaError::UnknownColumn {
                column: op.column.clone(),
            })?;

        for row in 0..batch.num_rows() {
            let cell = batch.value_mut(row, col);
            let (next, warned) = apply_kind(&op.kind, cell);
            if warned {
                report.coercion_warnings += 1;
            }
            *cell = next;
        }
    }

    Ok((batch, report))
}

/// Apply one operation to one value. Returns the new value and whether
/// a coercion warning was raised.
fn apply_kind(kind: &TransformKind, value: &Value) -> (Value, bool) {
    match kind {
        TransformKind::Uppercase => string_op(value, |s| s.to_uppercase()),
        TransformKind::Lowercase => string_op(value, |s| s.to_lowercase()),
        TransformKind::Strip => string_op(value, |s| s.trim().to_string()),
        TransformKind::ToDatetime => to_datetime(value),
        TransformKind::ToInt => to_int(value),
        TransformKind::ToFloat => to_float(value),
        TransformKind::Round { decimals } => round(value, *decimals),
        TransformKind::FillNa { value: fill } => {
            if value.is_null() {
                (fill.clone(), false)
            } else {
                (value.clone(), false)
            }
        }
        TransformKind::Custom { func, .. } => match func(value) {
            Ok(v) => (v, false),
            Err(_) => (Value::Null, true),
        },
    }
}

fn string_op(value: &Value, f: impl Fn(&str) -> String) -> (Value, bool) {
    match value {
        Value::Null => (Value::Null, false),
        Value::Str(s) => (Value::Str(f(s)), false),
        _ => (Value::Null, true),
    }
}

fn to_datetime(value: &Value) -> (Value, bool) {
    match value {
        Value::Null => (Value::Null, false),
        Value::Timestamp(_) => (value.clone(), false),
        Value::Str(s) => parse_datetime(s).map_or((Value::Null, true), |dt| {
            (Value::Timestamp(dt), false)
        }),
        _ => (Value::Null, true),
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, DATETIME_FMT) {
        return Some(ndt.and_utc());
    }
    if let Ok(nd) = NaiveDate::parse_from_str(s, DATE_FMT) {
        return Some(nd.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

#[allow(clippy::cast_possible_truncation)]
fn to_int(value: &Value) -> (Value, bool) {
    match value {
        Value::Null => (Value::Null, false),
        Value::Int(_) => (value.clone(), false),
        Value::Bool(b) => (Value::Int(i64::from(*b)), false),
        Value::Float(f) if f.is_finite() => (Value::Int(f.trunc() as i64), false),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_or((Value::Null, true), |v| (Value::Int(v), false)),
        _ => (Value::Null, true),
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_float(value: &Value) -> (Value, bool) {
    match value {
        Value::Null => (Value::Null, false),
        Value::Float(_) => (value.clone(), false),
        Value::Int(v) => (Value::Float(*v as f64), false),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_or((Value::Null, true), |v| (Value::Float(v), false)),
        _ => (Value::Null, true),
    }
}

#[allow(clippy::cast_possible_wrap)]
fn round(value: &Value, decimals: u32) -> (Value, bool) {
    match value {
        Value::Null => (Value::Null, false),
        Value::Int(_) => (value.clone(), false),
        Value::Float(f) => {
            let scale = 10f64.powi(decimals.min(18) as i32);
            (Value::Float((f * scale).round_ties_even() / scale), false)
        }
        _ => (Value::Null, true),
    }
}
