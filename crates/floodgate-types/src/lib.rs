//! Pure data model types for Floodgate pipelines.
//!
//! No I/O, no async, no engine logic. Everything here is shared by the
//! engine and state crates.

pub mod batch;
pub mod config;
pub mod cursor;
pub mod error;
pub mod mapping;
pub mod partition;
pub mod quality;
pub mod report;
pub mod state;
pub mod transform;
pub mod value;

pub use batch::RecordBatch;
pub use config::{PipelineConfig, RetryPolicy};
pub use cursor::{CursorType, CursorValue};
pub use error::{SchemaError, ValidationError};
pub use mapping::{ColumnMapping, ColumnSpec};
pub use partition::{PartitionId, PartitionOutcome, PartitionResult, PartitionSpec};
pub use quality::{QualityRule, RuleAction, RuleKind};
pub use report::{QualityReport, RuleOutcome, TransformReport};
pub use state::{PipelineId, RunStats, RunStatus, WatermarkState};
pub use transform::{CustomFn, TransformKind, TransformOp};
pub use value::Value;
