//! Data-quality rules and remediation actions.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value::Value;

/// What a [`QualityRule`] checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// The column must not be null.
    NotNull,
    /// The column must fall inside `[min, max]`. Null counts as
    /// out-of-range.
    Range { min: Value, max: Value },
    /// The column must be distinct within the batch.
    Unique,
}

/// How a violated rule is remediated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleAction {
    /// Remove the violating row.
    DropRow,
    /// Replace the violating value.
    FillValue { value: Value },
    /// Count the violation without touching the row.
    Flag,
    /// Keep the first occurrence per distinct value, in row order.
    DropDuplicates,
}

/// One validation rule with its remediation action.
///
/// Rules execute strictly in list order against the batch as mutated by
/// prior rules; a dropped row is gone for every later rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRule {
    /// Column the rule inspects.
    pub column: String,
    /// What is checked.
    #[serde(flatten)]
    pub kind: RuleKind,
    /// How violations are remediated.
    #[serde(flatten)]
    pub action: RuleAction,
}

impl QualityRule {
    /// Build a rule for `column`.
    #[must_use]
    pub fn new(column: impl Into<String>, kind: RuleKind, action: RuleAction) -> Self {
        Self {
            column: column.into(),
            kind,
            action,
        }
    }

    /// Check kind/action compatibility and parameter sanity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for incompatible pairs (e.g. `Unique`
    /// with anything but `DropDuplicates`) and for range bounds that are
    /// null, mixed-type, or inverted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut problems = Vec::new();

        match (&self.kind, &self.action) {
            (RuleKind::NotNull, RuleAction::DropRow | RuleAction::FillValue { .. } | RuleAction::Flag)
            | (RuleKind::Range { .. }, RuleAction::DropRow | RuleAction::Flag)
            | (RuleKind::Unique, RuleAction::DropDuplicates) => {}
            (kind, action) => problems.push(format!(
                "rule on column '{}': action {action:?} is not valid for {kind:?}",
                self.column
            )),
        }

        if let RuleKind::Range { min, max } = &self.kind {
            if min.is_null() || max.is_null() {
                problems.push(format!(
                    "range rule on column '{}': bounds must not be null",
                    self.column
                ));
            } else {
                match min.try_cmp(max) {
                    Some(ord) if ord != std::cmp::Ordering::Greater => {}
                    Some(_) => problems.push(format!(
                        "range rule on column '{}': min is greater than max",
                        self.column
                    )),
                    None => problems.push(format!(
                        "range rule on column '{}': bounds {} and {} are not comparable",
                        self.column,
                        min.type_name(),
                        max.type_name()
                    )),
                }
            }
        }

        if let RuleAction::FillValue { value } = &self.action {
            if value.is_null() {
                problems.push(format!(
                    "fill rule on column '{}': fill value must not be null",
                    self.column
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { problems })
        }
    }

    /// Deterministic token used for cache fingerprinting.
    #[must_use]
    pub fn fingerprint_token(&self) -> String {
        let kind = match &self.kind {
            RuleKind::NotNull => "not_null".to_string(),
            RuleKind::Range { min, max } => format!(
                "range[{},{}]",
                min.canonical_token(),
                max.canonical_token()
            ),
            RuleKind::Unique => "unique".to_string(),
        };
        let action = match &self.action {
            RuleAction::DropRow => "drop".to_string(),
            RuleAction::FillValue { value } => format!("fill={}", value.canonical_token()),
            RuleAction::Flag => "flag".to_string(),
            RuleAction::DropDuplicates => "drop_duplicates".to_string(),
        };
        format!("{kind}({}):{action}", self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_null_accepts_drop_fill_flag() {
        for action in [
            RuleAction::DropRow,
            RuleAction::FillValue {
                value: Value::Int(0),
            },
            RuleAction::Flag,
        ] {
            QualityRule::new("id", RuleKind::NotNull, action)
                .validate()
                .unwrap();
        }
    }

    #[test]
    fn unique_requires_drop_duplicates() {
        let err = QualityRule::new("id", RuleKind::Unique, RuleAction::DropRow)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("not valid"));

        QualityRule::new("id", RuleKind::Unique, RuleAction::DropDuplicates)
            .validate()
            .unwrap();
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        let err = QualityRule::new(
            "age",
            RuleKind::Range {
                min: Value::Int(10),
                max: Value::Int(1),
            },
            RuleAction::DropRow,
        )
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("min is greater than max"));
    }

    #[test]
    fn range_rejects_mixed_type_bounds() {
        let err = QualityRule::new(
            "age",
            RuleKind::Range {
                min: Value::Int(1),
                max: Value::Str("ten".into()),
            },
            RuleAction::DropRow,
        )
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("not comparable"));
    }

    #[test]
    fn range_accepts_cross_numeric_bounds() {
        QualityRule::new(
            "price",
            RuleKind::Range {
                min: Value::Int(0),
                max: Value::Float(99.5),
            },
            RuleAction::Flag,
        )
        .validate()
        .unwrap();
    }

    #[test]
    fn serde_roundtrip() {
        let rule = QualityRule::new(
            "age",
            RuleKind::Range {
                min: Value::Int(0),
                max: Value::Int(120),
            },
            RuleAction::Flag,
        );
        let json = serde_json::to_string(&rule).unwrap();
        let back: QualityRule = serde_json::from_str(&json).unwrap();
        assert_eq!(rule, back);
    }

    #[test]
    fn fingerprint_token_is_stable() {
        let rule = QualityRule::new("id", RuleKind::NotNull, RuleAction::DropRow);
        assert_eq!(rule.fingerprint_token(), "not_null(id):drop");
    }
}
