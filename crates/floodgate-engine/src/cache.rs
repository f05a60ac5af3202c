//! Fingerprint-keyed single-flight cache for transformation passes.
//!
//! Identical fingerprint means the transformation+quality pass would
//! produce identical output, so the cached result substitutes for
//! recomputation. Concurrent requests for the same fingerprint collapse
//! into one computation; requests for distinct fingerprints never block
//! each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use floodgate_types::batch::RecordBatch;
use floodgate_types::report::{QualityReport, TransformReport};
use tokio::sync::OnceCell;

use crate::error::PipelineError;

/// Output of one mapping+transformation+quality pass.
///
/// Carries the stage reports alongside the batch so a cache hit
/// reproduces the same counters a miss would have produced.
#[derive(Debug, Clone)]
pub struct PassOutput {
    /// The post-quality batch, ready to commit.
    pub batch: RecordBatch,
    /// Transformation-stage coercion warnings.
    pub transform: TransformReport,
    /// Quality-stage per-rule outcomes and totals.
    pub quality: QualityReport,
}

type Entry = Arc<OnceCell<PassOutput>>;

/// Shared, concurrency-safe pass cache.
///
/// The map lock is held only to clone the per-fingerprint cell; the
/// computation itself runs inside the cell, which guarantees at most
/// one in-flight compute per fingerprint.
pub struct PassCache {
    enabled: bool,
    entries: Mutex<HashMap<String, Entry>>,
}

impl PassCache {
    /// Create a cache. When `enabled` is `false`, every lookup computes.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached entries.
    ///
    /// # Panics
    ///
    /// Panics if the cache mutex was poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    /// Returns `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up `fingerprint`, computing and storing on a miss.
    ///
    /// Returns the pass output and whether it was served from the cache.
    /// A failed computation is not stored; the next request retries.
    ///
    /// # Errors
    ///
    /// Propagates the computation's error on a miss.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &str,
        compute: F,
    ) -> Result<(PassOutput, bool), PipelineError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<PassOutput, PipelineError>>,
    {
        if !self.enabled {
            return compute().await.map(|out| (out, false));
        }

        let entry = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| PipelineError::Infrastructure(anyhow::anyhow!("cache lock poisoned")))?;
            entries
                .entry(fingerprint.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let mut computed = false;
        let output = entry
            .get_or_try_init(|| {
                computed = true;
                compute()
            })
            .await?;
        Ok((output.clone(), !computed))
    }
}
