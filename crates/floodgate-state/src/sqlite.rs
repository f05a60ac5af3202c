//! `SQLite`-backed implementation of [`WatermarkStore`].
//!
//! Uses a single `Mutex<Connection>`; the connection lock doubles as the
//! read-modify-write critical section for monotonic merges.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use floodgate_types::cursor::{CursorType, CursorValue};
use floodgate_types::partition::PartitionId;
use floodgate_types::state::{PipelineId, RunStats, RunStatus};
use rusqlite::Connection;

use crate::backend::WatermarkStore;
use crate::error::{self, StateError};

/// Idempotent DDL for watermark and run-history tables.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS watermarks (
    pipeline TEXT NOT NULL,
    partition_id TEXT NOT NULL,
    cursor_type TEXT NOT NULL,
    cursor_value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (pipeline, partition_id)
);

CREATE TABLE IF NOT EXISTS partition_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pipeline TEXT NOT NULL,
    partition_id TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL DEFAULT (datetime('now')),
    finished_at TEXT,
    rows_read INTEGER DEFAULT 0,
    rows_written INTEGER DEFAULT 0,
    rows_dropped INTEGER DEFAULT 0,
    error_message TEXT
);
";

/// `SQLite`-backed watermark storage.
///
/// Create with [`SqliteWatermarkStore::open`] for file-backed
/// persistence or [`SqliteWatermarkStore::in_memory`] for tests.
pub struct SqliteWatermarkStore {
    conn: Mutex<Connection>,
}

impl SqliteWatermarkStore {
    /// Open or create a `SQLite` watermark database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory can't be created, or
    /// [`StateError::Sqlite`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Sqlite`] if the in-memory database can't be
    /// initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StateError::LockPoisoned)
    }

    fn read_cursor(
        conn: &Connection,
        pipeline: &PipelineId,
        partition: &PartitionId,
    ) -> error::Result<Option<CursorValue>> {
        let result = conn.query_row(
            "SELECT cursor_type, cursor_value FROM watermarks \
             WHERE pipeline = ?1 AND partition_id = ?2",
            rusqlite::params![pipeline.as_str(), partition.as_str()],
            |row| {
                let cursor_type: String = row.get(0)?;
                let cursor_value: String = row.get(1)?;
                Ok((cursor_type, cursor_value))
            },
        );

        match result {
            Ok((type_str, value_str)) => {
                let cursor_type = CursorType::parse(&type_str)?;
                Ok(Some(CursorValue::from_storage(cursor_type, &value_str)?))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(test)]
    fn get_run_row(
        &self,
        run_id: i64,
    ) -> error::Result<(String, i64, Option<String>, Option<String>)> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT status, rows_read, finished_at, error_message \
             FROM partition_runs WHERE id = ?1",
            [run_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .map_err(Into::into)
    }
}

impl WatermarkStore for SqliteWatermarkStore {
    fn get(
        &self,
        pipeline: &PipelineId,
        partition: &PartitionId,
    ) -> error::Result<Option<CursorValue>> {
        let conn = self.lock_conn()?;
        Self::read_cursor(&conn, pipeline, partition)
    }

    fn advance(
        &self,
        pipeline: &PipelineId,
        partition: &PartitionId,
        cursor: &CursorValue,
    ) -> error::Result<CursorValue> {
        let conn = self.lock_conn()?;

        let stored = Self::read_cursor(&conn, pipeline, partition)?;
        if let Some(ref current) = stored {
            let Some(ordering) = cursor.try_cmp(current) else {
                return Err(StateError::CursorTypeMismatch {
                    stored: current.cursor_type(),
                    given: cursor.cursor_type(),
                });
            };
            if ordering != std::cmp::Ordering::Greater {
                return Ok(current.clone());
            }
        }

        conn.execute(
            "INSERT INTO watermarks (pipeline, partition_id, cursor_type, cursor_value, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(pipeline, partition_id) \
             DO UPDATE SET cursor_type = ?3, cursor_value = ?4, updated_at = ?5",
            rusqlite::params![
                pipeline.as_str(),
                partition.as_str(),
                cursor.cursor_type().as_str(),
                cursor.as_storage(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(cursor.clone())
    }

    fn start_run(&self, pipeline: &PipelineId, partition: &PartitionId) -> error::Result<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO partition_runs (pipeline, partition_id, status) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                pipeline.as_str(),
                partition.as_str(),
                RunStatus::Running.as_str()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE partition_runs SET status = ?1, finished_at = datetime('now'), \
             rows_read = ?2, rows_written = ?3, rows_dropped = ?4, error_message = ?5 \
             WHERE id = ?6",
            rusqlite::params![
                status.as_str(),
                stats.rows_read as i64,
                stats.rows_written as i64,
                stats.rows_dropped as i64,
                stats.error_message,
                run_id,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pid(name: &str) -> PipelineId {
        PipelineId::new(name)
    }

    fn part(name: &str) -> PartitionId {
        PartitionId::new(name)
    }

    fn int_cursor(value: i64) -> CursorValue {
        CursorValue::Int64 { value }
    }

    #[test]
    fn watermark_roundtrip() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        assert!(store.get(&pid("p"), &part("0")).unwrap().is_none());

        store.advance(&pid("p"), &part("0"), &int_cursor(42)).unwrap();
        let got = store.get(&pid("p"), &part("0")).unwrap().unwrap();
        assert_eq!(got, int_cursor(42));
    }

    #[test]
    fn advance_is_monotonic() {
        let store = SqliteWatermarkStore::in_memory().unwrap();

        let merged = store.advance(&pid("p"), &part("0"), &int_cursor(100)).unwrap();
        assert_eq!(merged, int_cursor(100));

        // A lower cursor leaves the stored value alone.
        let merged = store.advance(&pid("p"), &part("0"), &int_cursor(50)).unwrap();
        assert_eq!(merged, int_cursor(100));
        assert_eq!(
            store.get(&pid("p"), &part("0")).unwrap().unwrap(),
            int_cursor(100)
        );

        let merged = store.advance(&pid("p"), &part("0"), &int_cursor(200)).unwrap();
        assert_eq!(merged, int_cursor(200));
    }

    #[test]
    fn advance_equal_value_is_noop() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        store.advance(&pid("p"), &part("0"), &int_cursor(7)).unwrap();
        let merged = store.advance(&pid("p"), &part("0"), &int_cursor(7)).unwrap();
        assert_eq!(merged, int_cursor(7));
    }

    #[test]
    fn advance_rejects_type_change() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        store.advance(&pid("p"), &part("0"), &int_cursor(7)).unwrap();

        let err = store
            .advance(
                &pid("p"),
                &part("0"),
                &CursorValue::Utf8 { value: "z".into() },
            )
            .unwrap_err();
        assert!(matches!(err, StateError::CursorTypeMismatch { .. }));
    }

    #[test]
    fn utf8_cursor_lexicographic_merge() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        let a = CursorValue::Utf8 {
            value: "2026-01-15T10:00:00Z".into(),
        };
        let b = CursorValue::Utf8 {
            value: "2026-01-14T10:00:00Z".into(),
        };
        store.advance(&pid("p"), &part("0"), &a).unwrap();
        let merged = store.advance(&pid("p"), &part("0"), &b).unwrap();
        assert_eq!(merged, a);
    }

    #[test]
    fn partitions_are_independent() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        store.advance(&pid("p"), &part("0"), &int_cursor(10)).unwrap();
        store.advance(&pid("p"), &part("1"), &int_cursor(20)).unwrap();

        assert_eq!(
            store.get(&pid("p"), &part("0")).unwrap().unwrap(),
            int_cursor(10)
        );
        assert_eq!(
            store.get(&pid("p"), &part("1")).unwrap().unwrap(),
            int_cursor(20)
        );
    }

    #[test]
    fn concurrent_advances_store_the_maximum() {
        let store = Arc::new(SqliteWatermarkStore::in_memory().unwrap());
        let mut handles = Vec::new();

        for t in 0..4i64 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50i64 {
                    // Interleaved, non-sorted sequence per thread.
                    let value = (i * 4 + t) % 200;
                    store
                        .advance(&pid("p"), &part("0"), &int_cursor(value))
                        .unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let got = store.get(&pid("p"), &part("0")).unwrap().unwrap();
        assert_eq!(got, int_cursor(199));
    }

    #[test]
    fn run_lifecycle() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        let run_id = store.start_run(&pid("p"), &part("0")).unwrap();
        assert!(run_id > 0);

        store
            .complete_run(
                run_id,
                RunStatus::Completed,
                &RunStats {
                    rows_read: 1000,
                    rows_written: 990,
                    rows_dropped: 10,
                    error_message: None,
                },
            )
            .unwrap();

        let (status, rows_read, finished, _error) = store.get_run_row(run_id).unwrap();
        assert_eq!(status, "completed");
        assert_eq!(rows_read, 1000);
        assert!(finished.is_some());
    }

    #[test]
    fn run_failure_records_error() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        let run_id = store.start_run(&pid("p"), &part("3")).unwrap();

        store
            .complete_run(
                run_id,
                RunStatus::Failed,
                &RunStats {
                    rows_read: 50,
                    rows_written: 0,
                    rows_dropped: 0,
                    error_message: Some("commit failed after 2 attempts".into()),
                },
            )
            .unwrap();

        let (status, _rows, _finished, error_msg) = store.get_run_row(run_id).unwrap();
        assert_eq!(status, "failed");
        assert_eq!(error_msg, Some("commit failed after 2 attempts".into()));
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("watermarks.db");

        {
            let store = SqliteWatermarkStore::open(&path).unwrap();
            store.advance(&pid("p"), &part("0"), &int_cursor(77)).unwrap();
        }

        let store = SqliteWatermarkStore::open(&path).unwrap();
        assert_eq!(
            store.get(&pid("p"), &part("0")).unwrap().unwrap(),
            int_cursor(77)
        );
    }
}
