//! Transformation and load engine for Floodgate pipelines.
//!
//! Given bounded batches of records, deterministically applies column
//! mapping, ordered transformation operations, and ordered data-quality
//! rules, then commits the result to a target with incremental-watermark
//! bookkeeping and partition-parallel coordination.

pub mod adapter;
pub mod cache;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod mapper;
pub mod orchestrator;
pub mod quality;
pub mod result;
pub mod transform;
pub mod validate;

pub use adapter::{AdapterError, AdapterFactory, CommitOutcome, SourceAdapter, SourcePull, TargetAdapter};
pub use cache::{PassCache, PassOutput};
pub use coordinator::run_parallel;
pub use error::PipelineError;
pub use events::{BatchStage, EventSink, NullSink, PipelineEvent, TracingSink};
pub use fingerprint::batch_fingerprint;
pub use orchestrator::{run_partition, PipelinePlan};
pub use result::RunTotals;
pub use validate::validate_pipeline;
