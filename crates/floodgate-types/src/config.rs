//! Pipeline configuration surface consumed by the engine.
//!
//! Closed serde structs with explicit defaults. Semantic validation
//! (positivity, incremental-mode coherence, rule/op column references)
//! happens eagerly in the engine's validator, before any batch is
//! pulled.

use serde::{Deserialize, Serialize};

/// Retry bound and backoff schedule for target commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total commit attempts per batch (first try included).
    pub max_attempts: u32,
    /// Base delay; doubles each attempt.
    pub backoff_base_ms: u64,
    /// Delay ceiling.
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 1_000,
            backoff_max_ms: 60_000,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline identity; keys watermark and run-history rows.
    pub pipeline: String,

    /// Maximum rows per pulled batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Bounded worker pool size for partition-parallel runs.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// When `true`, transformation+quality passes are memoized by
    /// content fingerprint.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// When `true`, source pulls are filtered by the stored watermark
    /// and the watermark advances after each committed batch.
    #[serde(default)]
    pub incremental: bool,

    /// Column supplying the watermark cursor. Required in incremental
    /// mode; read from the committed (post-quality) batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark_column: Option<String>,

    /// Append to the target (`true`) or replace its contents per batch
    /// commit (`false`).
    #[serde(default = "default_true")]
    pub append: bool,

    /// Commit retry bound and backoff schedule.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Per-batch commit timeout in milliseconds; a timeout is a
    /// transient commit failure.
    #[serde(default = "default_commit_timeout_ms")]
    pub commit_timeout_ms: u64,
}

fn default_batch_size() -> usize {
    10_000
}

fn default_worker_count() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_commit_timeout_ms() -> u64 {
    30_000
}

impl PipelineConfig {
    /// Configuration with defaults for everything but the pipeline name.
    #[must_use]
    pub fn named(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            batch_size: default_batch_size(),
            worker_count: default_worker_count(),
            cache_enabled: true,
            incremental: false,
            watermark_column: None,
            append: true,
            retry: RetryPolicy::default(),
            commit_timeout_ms: default_commit_timeout_ms(),
        }
    }
}
