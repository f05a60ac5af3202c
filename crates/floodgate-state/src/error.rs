//! Watermark store error types.

use floodgate_types::cursor::CursorType;
use floodgate_types::error::CursorParseError;

/// Errors produced by [`WatermarkStore`](crate::WatermarkStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File-system I/O failure (e.g. creating the database directory).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal mutex was poisoned by a panicked thread.
    #[error("watermark store lock poisoned")]
    LockPoisoned,

    /// A persisted cursor string failed to parse as its stored type.
    #[error(transparent)]
    CursorParse(#[from] CursorParseError),

    /// An advance used a cursor type different from the stored one.
    #[error("cursor type mismatch: stored {stored}, advanced with {given}")]
    CursorTypeMismatch {
        stored: CursorType,
        given: CursorType,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StateError>;
