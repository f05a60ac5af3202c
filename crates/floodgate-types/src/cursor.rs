//! Cursor types for incremental watermark tracking.
//!
//! A cursor marks the highest-processed position in a source, so that
//! subsequent runs can scope extraction to "changed since". Watermarks
//! never regress: concurrent advances merge to the maximum.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::CursorParseError;
use crate::value::Value;

/// Data type of a cursor value.
///
/// Determines how cursor values are compared and how the persisted
/// string form is parsed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorType {
    /// 64-bit signed integer cursor.
    Int64,
    /// UTF-8 string cursor (lexicographic order).
    Utf8,
    /// Microsecond-precision timestamp cursor.
    TimestampMicros,
}

impl CursorType {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::Utf8 => "utf8",
            Self::TimestampMicros => "timestamp_micros",
        }
    }

    /// Parse the wire-format string produced by [`CursorType::as_str`].
    ///
    /// # Errors
    ///
    /// Returns [`CursorParseError`] for unknown type names.
    pub fn parse(raw: &str) -> Result<Self, CursorParseError> {
        match raw {
            "int64" => Ok(Self::Int64),
            "utf8" => Ok(Self::Utf8),
            "timestamp_micros" => Ok(Self::TimestampMicros),
            _ => Err(CursorParseError {
                cursor_type: "unknown".to_string(),
                raw: raw.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for CursorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed cursor position value.
///
/// Serialized with a `type` tag and a named `value` field:
/// `{"type": "int64", "value": 42}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CursorValue {
    /// 64-bit signed integer position.
    Int64 { value: i64 },
    /// UTF-8 string position.
    Utf8 { value: String },
    /// Microsecond-precision timestamp position.
    TimestampMicros { value: i64 },
}

impl CursorValue {
    /// The type of this cursor value.
    #[must_use]
    pub fn cursor_type(&self) -> CursorType {
        match self {
            Self::Int64 { .. } => CursorType::Int64,
            Self::Utf8 { .. } => CursorType::Utf8,
            Self::TimestampMicros { .. } => CursorType::TimestampMicros,
        }
    }

    /// Compare two cursors of the same type.
    ///
    /// Returns `None` when the types differ; a mixed-type comparison is a
    /// configuration fault, never an ordering.
    #[must_use]
    pub fn try_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int64 { value: a }, Self::Int64 { value: b })
            | (Self::TimestampMicros { value: a }, Self::TimestampMicros { value: b }) => {
                Some(a.cmp(b))
            }
            (Self::Utf8 { value: a }, Self::Utf8 { value: b }) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// String form persisted by watermark stores.
    #[must_use]
    pub fn as_storage(&self) -> String {
        match self {
            Self::Int64 { value } => value.to_string(),
            Self::Utf8 { value } => value.clone(),
            Self::TimestampMicros { value } => value.to_string(),
        }
    }

    /// Rebuild a cursor from its persisted `(type, value)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`CursorParseError`] when the stored string does not parse
    /// as the stored type.
    pub fn from_storage(cursor_type: CursorType, raw: &str) -> Result<Self, CursorParseError> {
        let parse_err = || CursorParseError {
            cursor_type: cursor_type.as_str().to_string(),
            raw: raw.to_string(),
        };
        match cursor_type {
            CursorType::Int64 => raw
                .parse::<i64>()
                .map(|value| Self::Int64 { value })
                .map_err(|_| parse_err()),
            CursorType::Utf8 => Ok(Self::Utf8 {
                value: raw.to_string(),
            }),
            CursorType::TimestampMicros => raw
                .parse::<i64>()
                .map(|value| Self::TimestampMicros { value })
                .map_err(|_| parse_err()),
        }
    }

    /// Lift a record cell into a cursor, when its type supports ordering
    /// a watermark (`Int`, `Str`, or `Timestamp`).
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(Self::Int64 { value: *v }),
            Value::Str(v) => Some(Self::Utf8 { value: v.clone() }),
            Value::Timestamp(v) => Some(Self::TimestampMicros {
                value: v.timestamp_micros(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_value_json_format() {
        let cv = CursorValue::Int64 { value: 42 };
        let json = serde_json::to_value(&cv).unwrap();
        assert_eq!(json, serde_json::json!({"type": "int64", "value": 42}));
    }

    #[test]
    fn same_type_ordering() {
        let a = CursorValue::Int64 { value: 10 };
        let b = CursorValue::Int64 { value: 20 };
        assert_eq!(a.try_cmp(&b), Some(Ordering::Less));

        let x = CursorValue::Utf8 { value: "b".into() };
        let y = CursorValue::Utf8 { value: "a".into() };
        assert_eq!(x.try_cmp(&y), Some(Ordering::Greater));
    }

    #[test]
    fn mixed_type_ordering_is_none() {
        let a = CursorValue::Int64 { value: 10 };
        let b = CursorValue::Utf8 { value: "10".into() };
        assert!(a.try_cmp(&b).is_none());
    }

    #[test]
    fn storage_roundtrip() {
        let cases = vec![
            CursorValue::Int64 { value: -5 },
            CursorValue::Utf8 {
                value: "2026-01-15T10:00:00Z".into(),
            },
            CursorValue::TimestampMicros {
                value: 1_700_000_000_000_000,
            },
        ];
        for cv in cases {
            let back = CursorValue::from_storage(cv.cursor_type(), &cv.as_storage()).unwrap();
            assert_eq!(cv, back);
        }
    }

    #[test]
    fn storage_parse_failure() {
        let err = CursorValue::from_storage(CursorType::Int64, "not-a-number").unwrap_err();
        assert!(err.to_string().contains("not-a-number"));
    }

    #[test]
    fn from_value_conversions() {
        assert_eq!(
            CursorValue::from_value(&Value::Int(9)),
            Some(CursorValue::Int64 { value: 9 })
        );
        assert!(CursorValue::from_value(&Value::Float(1.0)).is_none());
        assert!(CursorValue::from_value(&Value::Null).is_none());
    }
}
