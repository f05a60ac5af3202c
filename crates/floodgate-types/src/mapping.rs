//! Column mapping from source names to target names.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One target column and the source column it is copied from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Name of the column in the mapped output.
    pub target: String,
    /// Name of the column in the source batch.
    pub source: String,
    /// When `true`, an absent source column yields an all-null target
    /// column instead of a schema error.
    #[serde(default)]
    pub optional: bool,
}

impl ColumnSpec {
    /// Required mapping entry.
    #[must_use]
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
            optional: false,
        }
    }

    /// Optional mapping entry.
    #[must_use]
    pub fn optional(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
            optional: true,
        }
    }
}

/// Ordered mapping from target column names to source column names.
///
/// The mapping must be a function: each target column appears exactly
/// once. Source columns not referenced by any entry are dropped from the
/// mapped output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnSpec>", into = "Vec<ColumnSpec>")]
pub struct ColumnMapping {
    entries: Vec<ColumnSpec>,
}

impl ColumnMapping {
    /// Build a mapping, rejecting duplicate target columns.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when a target column appears more than
    /// once or the mapping is empty.
    pub fn new(entries: Vec<ColumnSpec>) -> Result<Self, ValidationError> {
        let mut problems = Vec::new();
        if entries.is_empty() {
            problems.push("column mapping must not be empty".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for spec in &entries {
            if !seen.insert(spec.target.as_str()) {
                problems.push(format!(
                    "target column '{}' is mapped more than once",
                    spec.target
                ));
            }
        }
        if problems.is_empty() {
            Ok(Self { entries })
        } else {
            Err(ValidationError { problems })
        }
    }

    /// Mapping entries in target-column order.
    #[must_use]
    pub fn entries(&self) -> &[ColumnSpec] {
        &self.entries
    }

    /// Deterministic token used for cache fingerprinting.
    #[must_use]
    pub fn fingerprint_token(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|s| {
                if s.optional {
                    format!("{}<-{}?", s.target, s.source)
                } else {
                    format!("{}<-{}", s.target, s.source)
                }
            })
            .collect();
        parts.join(",")
    }
}

impl TryFrom<Vec<ColumnSpec>> for ColumnMapping {
    type Error = ValidationError;

    fn try_from(entries: Vec<ColumnSpec>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<ColumnMapping> for Vec<ColumnSpec> {
    fn from(mapping: ColumnMapping) -> Self {
        mapping.entries
    }
}
