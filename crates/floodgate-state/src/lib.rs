//! Watermark store: persistent incremental cursors and run history.
//!
//! The [`WatermarkStore`] trait defines the contract; [`SqliteWatermarkStore`]
//! is the durable implementation, [`MemoryWatermarkStore`] the in-memory one.

pub mod backend;
pub mod error;
pub mod memory;
pub mod sqlite;

pub use backend::WatermarkStore;
pub use error::{Result, StateError};
pub use memory::MemoryWatermarkStore;
pub use sqlite::SqliteWatermarkStore;
