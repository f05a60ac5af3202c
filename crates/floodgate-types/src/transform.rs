//! Column transformation operations.
//!
//! Operation kinds form a closed set; anything outside it goes through
//! [`TransformKind::Custom`], which carries an injected pure function so
//! exhaustiveness stays checkable.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Injected pure per-value function for [`TransformKind::Custom`].
///
/// Must be deterministic: no wall-clock, no randomness, no I/O. An `Err`
/// result converts to a per-row null plus a counted warning; it never
/// escapes the engine.
pub type CustomFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// What a [`TransformOp`] does to its target column.
#[derive(Clone)]
pub enum TransformKind {
    /// Uppercase a string value.
    Uppercase,
    /// Lowercase a string value.
    Lowercase,
    /// Trim leading and trailing whitespace from a string value.
    Strip,
    /// Parse into a UTC timestamp.
    ToDatetime,
    /// Parse or coerce into a 64-bit integer.
    ToInt,
    /// Parse or coerce into a 64-bit float.
    ToFloat,
    /// Half-to-even rounding to `decimals` fractional digits.
    Round { decimals: u32 },
    /// Replace nulls with a fixed value.
    FillNa { value: Value },
    /// Externally supplied pure function, identified by `name` for
    /// fingerprinting and diagnostics.
    Custom { name: String, func: CustomFn },
}

impl fmt::Debug for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uppercase => f.write_str("Uppercase"),
            Self::Lowercase => f.write_str("Lowercase"),
            Self::Strip => f.write_str("Strip"),
            Self::ToDatetime => f.write_str("ToDatetime"),
            Self::ToInt => f.write_str("ToInt"),
            Self::ToFloat => f.write_str("ToFloat"),
            Self::Round { decimals } => write!(f, "Round({decimals})"),
            Self::FillNa { value } => write!(f, "FillNa({value:?})"),
            Self::Custom { name, .. } => write!(f, "Custom({name})"),
        }
    }
}

/// One transformation applied to one column across every row.
///
/// Ops execute strictly in list order; later ops observe earlier ops'
/// effects on the same or other columns.
#[derive(Debug, Clone)]
pub struct TransformOp {
    /// Target column name.
    pub column: String,
    /// Operation applied to each of the column's values.
    pub kind: TransformKind,
}

impl TransformOp {
    /// Build an op for `column`.
    #[must_use]
    pub fn new(column: impl Into<String>, kind: TransformKind) -> Self {
        Self {
            column: column.into(),
            kind,
        }
    }

    /// Deterministic token used for cache fingerprinting.
    ///
    /// Custom functions contribute their `name`; callers own keeping
    /// names stable across runs.
    #[must_use]
    pub fn fingerprint_token(&self) -> String {
        match &self.kind {
            TransformKind::Uppercase => format!("uppercase({})", self.column),
            TransformKind::Lowercase => format!("lowercase({})", self.column),
            TransformKind::Strip => format!("strip({})", self.column),
            TransformKind::ToDatetime => format!("to_datetime({})", self.column),
            TransformKind::ToInt => format!("to_int({})", self.column),
            TransformKind::ToFloat => format!("to_float({})", self.column),
            TransformKind::Round { decimals } => format!("round({},{})", self.column, decimals),
            TransformKind::FillNa { value } => {
                format!("fill_na({},{})", self.column, value.canonical_token())
            }
            TransformKind::Custom { name, .. } => format!("custom({},{})", self.column, name),
        }
    }
}
