//! Pipeline error model and retry backoff policy helpers.

use std::time::Duration;

use floodgate_types::config::RetryPolicy;
use floodgate_types::error::{SchemaError, ValidationError};

use crate::adapter::AdapterError;

/// Categorized pipeline error for retry and propagation decisions.
///
/// `Schema` is fatal to the batch but not the run; `Validation` is fatal
/// to the run before any batch is pulled; `Transient` enters the retry
/// path; `Adapter` and `Infrastructure` fail without retry.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or mismatched columns in a batch.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Malformed configuration, mapping, or rule parameters.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Source/target I/O failure worth retrying.
    #[error("transient i/o error: {0}")]
    Transient(String),

    /// Non-retryable adapter failure.
    #[error("adapter error: {0}")]
    Adapter(String),

    /// Host-side failure (watermark store, task join, etc.).
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl PipelineError {
    /// Returns `true` when the retry loop should take another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Returns `true` when only the current batch is lost and the
    /// partition loop may continue with the next pull.
    #[must_use]
    pub fn is_batch_fatal_only(&self) -> bool {
        matches!(self, Self::Schema(_))
    }
}

impl From<AdapterError> for PipelineError {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::Transient(msg) => Self::Transient(msg),
            AdapterError::Fatal(msg) => Self::Adapter(msg),
        }
    }
}

impl From<floodgate_state::StateError> for PipelineError {
    fn from(e: floodgate_state::StateError) -> Self {
        Self::Infrastructure(e.into())
    }
}

/// Compute the retry delay for `attempt` (1-based): the base doubles
/// each attempt and is capped at the policy ceiling.
#[must_use]
pub fn compute_backoff(policy: &RetryPolicy, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(32);
    let delay_ms = policy
        .backoff_base_ms
        .saturating_mul(2u64.saturating_pow(exp));
    Duration::from_millis(delay_ms.min(policy.backoff_max_ms))
}
