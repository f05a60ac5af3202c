//! Content fingerprints for the transformation cache.
//!
//! A fingerprint covers the batch content plus the full pipeline shape
//! (mapping, op list, rule list): identical fingerprint means the
//! transformation+quality pass would produce identical output.

use floodgate_types::batch::RecordBatch;
use floodgate_types::mapping::ColumnMapping;
use floodgate_types::quality::QualityRule;
use floodgate_types::transform::TransformOp;
use sha2::{Digest, Sha256};

// Field and record separators keep adjacent tokens from colliding
// ("ab"+"c" vs "a"+"bc").
const FIELD_SEP: &[u8] = b"\x1f";
const RECORD_SEP: &[u8] = b"\x1e";

/// SHA-256 hex fingerprint of a batch plus its pipeline configuration.
#[must_use]
pub fn batch_fingerprint(
    batch: &RecordBatch,
    mapping: &ColumnMapping,
    ops: &[TransformOp],
    rules: &[QualityRule],
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(mapping.fingerprint_token().as_bytes());
    hasher.update(RECORD_SEP);

    for op in ops {
        hasher.update(op.fingerprint_token().as_bytes());
        hasher.update(FIELD_SEP);
    }
    hasher.update(RECORD_SEP);

    for rule in rules {
        hasher.update(rule.fingerprint_token().as_bytes());
        hasher.update(FIELD_SEP);
    }
    hasher.update(RECORD_SEP);

    for column in batch.columns() {
        hasher.update(column.as_bytes());
        hasher.update(FIELD_SEP);
    }
    hasher.update(RECORD_SEP);

    for row in batch.rows() {
        for value in row {
            hasher.update(value.canonical_token().as_bytes());
            hasher.update(FIELD_SEP);
        }
        hasher.update(RECORD_SEP);
    }

    format!("{:x}", hasher.finalize())
}
