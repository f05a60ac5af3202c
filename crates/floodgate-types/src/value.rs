//! Scalar value model shared by every pipeline stage.
//!
//! A [`Value`] is the typed content of one record cell. The serialized
//! form carries a `type` tag with a named `value` field
//! (`{"type": "int", "value": 42}`) so persisted batches stay
//! self-describing.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typed scalar held by a record cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Absent, unknown, or unparseable value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Numeric view of the value, when it has one.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow the string content, when the value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Compare two values of compatible types.
    ///
    /// Ints and floats compare cross-type through their numeric view;
    /// strings and timestamps compare within their own type. Everything
    /// else (including any comparison against null) is `None`.
    #[must_use]
    pub fn try_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_f64()?;
                let b = other.as_f64()?;
                a.partial_cmp(&b)
            }
        }
    }

    /// Deterministic token used for fingerprinting and duplicate keys.
    ///
    /// Floats render through their shortest round-trip representation,
    /// timestamps through microsecond offsets, so equal values always
    /// produce equal tokens.
    #[must_use]
    pub fn canonical_token(&self) -> String {
        match self {
            Self::Null => "n".to_string(),
            Self::Bool(v) => format!("b:{v}"),
            Self::Int(v) => format!("i:{v}"),
            Self::Float(v) => format!("f:{v:?}"),
            Self::Str(v) => format!("s:{v}"),
            Self::Timestamp(v) => format!("t:{}", v.timestamp_micros()),
        }
    }
}
