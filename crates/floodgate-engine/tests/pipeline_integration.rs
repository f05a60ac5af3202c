//! End-to-end pipeline tests over in-memory adapters and a real
//! `SQLite` watermark store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use floodgate_engine::adapter::{
    AdapterError, AdapterFactory, CommitOutcome, SourceAdapter, SourcePull, TargetAdapter,
};
use floodgate_engine::events::NullSink;
use floodgate_engine::orchestrator::PipelinePlan;
use floodgate_engine::{run_parallel, RunTotals};
use floodgate_state::{MemoryWatermarkStore, SqliteWatermarkStore, WatermarkStore};
use floodgate_types::batch::RecordBatch;
use floodgate_types::config::{PipelineConfig, RetryPolicy};
use floodgate_types::cursor::CursorValue;
use floodgate_types::mapping::{ColumnMapping, ColumnSpec};
use floodgate_types::partition::{PartitionId, PartitionSpec};
use floodgate_types::quality::{QualityRule, RuleAction, RuleKind};
use floodgate_types::state::PipelineId;
use floodgate_types::transform::{TransformKind, TransformOp};
use floodgate_types::value::Value;
use tokio_util::sync::CancellationToken;

/// Rows keyed by partition id; each partition's rows are served in
/// `batch_size`-bounded chunks, filtered by the `since` cursor.
struct FixtureSource {
    rows: Vec<Vec<Value>>,
    columns: Vec<String>,
    cursor_col: Option<usize>,
    offset: usize,
}

#[async_trait]
impl SourceAdapter for FixtureSource {
    async fn pull_batch(
        &mut self,
        max_rows: usize,
        since: Option<&CursorValue>,
    ) -> Result<SourcePull, AdapterError> {
        let filtered: Vec<Vec<Value>> = self
            .rows
            .iter()
            .filter(|row| match (since, self.cursor_col) {
                (Some(CursorValue::Int64 { value }), Some(col)) => {
                    matches!(&row[col], Value::Int(v) if v > value)
                }
                _ => true,
            })
            .cloned()
            .collect();

        let chunk: Vec<Vec<Value>> = filtered
            .iter()
            .skip(self.offset)
            .take(max_rows)
            .cloned()
            .collect();
        self.offset += chunk.len();
        let exhausted = self.offset >= filtered.len();

        let batch = RecordBatch::from_rows(self.columns.clone(), chunk)
            .map_err(|e| AdapterError::Fatal(e.to_string()))?;
        Ok(SourcePull { batch, exhausted })
    }
}

/// Collects committed rows per partition; whole-batch or nothing.
struct CollectingTarget {
    partition: String,
    sink: Arc<Mutex<HashMap<String, Vec<Vec<Value>>>>>,
}

#[async_trait]
impl TargetAdapter for CollectingTarget {
    async fn commit_batch(
        &mut self,
        batch: &RecordBatch,
        _append: bool,
    ) -> Result<CommitOutcome, AdapterError> {
        self.sink
            .lock()
            .unwrap()
            .entry(self.partition.clone())
            .or_default()
            .extend(batch.rows().iter().cloned());
        Ok(CommitOutcome {
            rows_written: batch.num_rows() as u64,
        })
    }
}

struct FixtureFactory {
    data: HashMap<String, Vec<Vec<Value>>>,
    columns: Vec<String>,
    cursor_col: Option<usize>,
    committed: Arc<Mutex<HashMap<String, Vec<Vec<Value>>>>>,
}

impl AdapterFactory for FixtureFactory {
    fn open_source(&self, partition: &PartitionSpec) -> Result<Box<dyn SourceAdapter>, AdapterError> {
        let rows = self
            .data
            .get(partition.id.as_str())
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(FixtureSource {
            rows,
            columns: self.columns.clone(),
            cursor_col: self.cursor_col,
            offset: 0,
        }))
    }

    fn open_target(&self, partition: &PartitionSpec) -> Result<Box<dyn TargetAdapter>, AdapterError> {
        Ok(Box::new(CollectingTarget {
            partition: partition.id.as_str().to_string(),
            sink: self.committed.clone(),
        }))
    }
}

fn user_mapping() -> ColumnMapping {
    ColumnMapping::new(vec![
        ColumnSpec::new("id", "id"),
        ColumnSpec::new("email", "email"),
    ])
    .unwrap()
}

fn user_row(id: Option<i64>, email: &str) -> Vec<Value> {
    vec![
        id.map_or(Value::Null, Value::Int),
        Value::Str(email.to_string()),
    ]
}

fn base_config(name: &str) -> PipelineConfig {
    let mut config = PipelineConfig::named(name);
    config.retry = RetryPolicy {
        max_attempts: 2,
        backoff_base_ms: 1,
        backoff_max_ms: 2,
    };
    config
}

#[tokio::test]
async fn lowercase_then_not_null_drop_scenario() {
    // Input: [{id:1, email:"A@X.com"}, {id:null, email:"b@y.com"}]
    // Expected output: [{id:1, email:"a@x.com"}], one row dropped.
    let committed = Arc::new(Mutex::new(HashMap::new()));
    let factory = Arc::new(FixtureFactory {
        data: HashMap::from([(
            "p0".to_string(),
            vec![user_row(Some(1), "A@X.com"), user_row(None, "b@y.com")],
        )]),
        columns: vec!["id".to_string(), "email".to_string()],
        cursor_col: None,
        committed: committed.clone(),
    });

    let plan = Arc::new(PipelinePlan {
        config: base_config("users-load"),
        mapping: user_mapping(),
        ops: vec![TransformOp::new("email", TransformKind::Lowercase)],
        rules: vec![QualityRule::new("id", RuleKind::NotNull, RuleAction::DropRow)],
    });

    let results = run_parallel(
        plan,
        vec![PartitionSpec::new("p0")],
        factory,
        Arc::new(MemoryWatermarkStore::new()),
        Arc::new(NullSink),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].is_success());
    assert_eq!(results[0].rows_read, 2);
    assert_eq!(results[0].rows_written, 1);
    assert_eq!(results[0].rows_dropped, 1);

    let committed = committed.lock().unwrap();
    assert_eq!(
        committed["p0"],
        vec![vec![Value::Int(1), Value::Str("a@x.com".into())]]
    );
}

#[tokio::test]
async fn shared_cache_computes_identical_partitions_once() {
    // Two partitions with byte-identical content: the custom op's call
    // counter shows the transformation pass ran for only one of them.
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_op = calls.clone();

    let committed = Arc::new(Mutex::new(HashMap::new()));
    let rows = vec![user_row(Some(1), "a@x.com"), user_row(Some(2), "b@y.com")];
    let factory = Arc::new(FixtureFactory {
        data: HashMap::from([
            ("p0".to_string(), rows.clone()),
            ("p1".to_string(), rows),
        ]),
        columns: vec!["id".to_string(), "email".to_string()],
        cursor_col: None,
        committed: committed.clone(),
    });

    let mut config = base_config("cache-test");
    // One worker serializes the partitions, so the second sees the
    // first's completed cache entry rather than racing it.
    config.worker_count = 1;
    let plan = Arc::new(PipelinePlan {
        config,
        mapping: user_mapping(),
        ops: vec![TransformOp::new(
            "email",
            TransformKind::Custom {
                name: "count_calls".into(),
                func: Arc::new(move |v| {
                    calls_in_op.fetch_add(1, Ordering::SeqCst);
                    Ok(v.clone())
                }),
            },
        )],
        rules: vec![],
    });

    let results = run_parallel(
        plan,
        vec![PartitionSpec::new("p0"), PartitionSpec::new("p1")],
        factory,
        Arc::new(MemoryWatermarkStore::new()),
        Arc::new(NullSink),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(results.iter().all(|r| r.is_success()));
    // 2 rows transformed once, not twice.
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The cache hit still writes the same rows to the second partition.
    let committed = committed.lock().unwrap();
    assert_eq!(committed["p0"], committed["p1"]);

    let totals = RunTotals::summarize(&results);
    assert_eq!(totals.rows_written, 4);
    assert!(totals.all_succeeded());
}

#[tokio::test]
async fn disabled_cache_computes_every_partition() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_op = calls.clone();

    let rows = vec![user_row(Some(1), "a@x.com")];
    let factory = Arc::new(FixtureFactory {
        data: HashMap::from([
            ("p0".to_string(), rows.clone()),
            ("p1".to_string(), rows),
        ]),
        columns: vec!["id".to_string(), "email".to_string()],
        cursor_col: None,
        committed: Arc::new(Mutex::new(HashMap::new())),
    });

    let mut config = base_config("cache-off-test");
    config.worker_count = 1;
    config.cache_enabled = false;
    let plan = Arc::new(PipelinePlan {
        config,
        mapping: user_mapping(),
        ops: vec![TransformOp::new(
            "email",
            TransformKind::Custom {
                name: "count_calls".into(),
                func: Arc::new(move |v| {
                    calls_in_op.fetch_add(1, Ordering::SeqCst);
                    Ok(v.clone())
                }),
            },
        )],
        rules: vec![],
    });

    run_parallel(
        plan,
        vec![PartitionSpec::new("p0"), PartitionSpec::new("p1")],
        factory,
        Arc::new(MemoryWatermarkStore::new()),
        Arc::new(NullSink),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn incremental_rerun_skips_committed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("watermarks.db");

    let columns = vec!["id".to_string(), "seq".to_string()];
    let mapping = ColumnMapping::new(vec![
        ColumnSpec::new("id", "id"),
        ColumnSpec::new("seq", "seq"),
    ])
    .unwrap();
    let rows = vec![
        vec![Value::Int(1), Value::Int(10)],
        vec![Value::Int(2), Value::Int(20)],
        vec![Value::Int(3), Value::Int(30)],
    ];

    let mut config = base_config("incremental-test");
    config.incremental = true;
    config.watermark_column = Some("seq".into());

    let run = |committed: Arc<Mutex<HashMap<String, Vec<Vec<Value>>>>>| {
        let factory = Arc::new(FixtureFactory {
            data: HashMap::from([("p0".to_string(), rows.clone())]),
            columns: columns.clone(),
            cursor_col: Some(1),
            committed,
        });
        let plan = Arc::new(PipelinePlan {
            config: config.clone(),
            mapping: mapping.clone(),
            ops: vec![],
            rules: vec![],
        });
        let store: Arc<dyn WatermarkStore> =
            Arc::new(SqliteWatermarkStore::open(&db_path).unwrap());
        run_parallel(
            plan,
            vec![PartitionSpec::new("p0")],
            factory,
            store,
            Arc::new(NullSink),
            CancellationToken::new(),
        )
    };

    // First run moves everything and leaves the watermark at 30.
    let first_committed = Arc::new(Mutex::new(HashMap::new()));
    let results = run(first_committed.clone()).await.unwrap();
    assert_eq!(results[0].rows_written, 3);

    let store = SqliteWatermarkStore::open(&db_path).unwrap();
    assert_eq!(
        store
            .get(
                &PipelineId::new("incremental-test"),
                &PartitionId::new("p0")
            )
            .unwrap(),
        Some(CursorValue::Int64 { value: 30 })
    );

    // Second run over the same source reads nothing new.
    let second_committed = Arc::new(Mutex::new(HashMap::new()));
    let results = run(second_committed.clone()).await.unwrap();
    assert_eq!(results[0].rows_read, 0);
    assert_eq!(results[0].rows_written, 0);
    assert!(second_committed.lock().unwrap().is_empty()
        || second_committed.lock().unwrap()["p0"].is_empty());
}

#[tokio::test]
async fn duplicate_rows_keep_first_occurrence_end_to_end() {
    let committed = Arc::new(Mutex::new(HashMap::new()));
    let factory = Arc::new(FixtureFactory {
        data: HashMap::from([(
            "p0".to_string(),
            vec![
                user_row(Some(1), "dup@x.com"),
                user_row(Some(2), "dup@x.com"),
                user_row(Some(3), "other@y.com"),
            ],
        )]),
        columns: vec!["id".to_string(), "email".to_string()],
        cursor_col: None,
        committed: committed.clone(),
    });

    let plan = Arc::new(PipelinePlan {
        config: base_config("dedup-test"),
        mapping: user_mapping(),
        ops: vec![],
        rules: vec![QualityRule::new(
            "email",
            RuleKind::Unique,
            RuleAction::DropDuplicates,
        )],
    });

    let results = run_parallel(
        plan,
        vec![PartitionSpec::new("p0")],
        factory,
        Arc::new(MemoryWatermarkStore::new()),
        Arc::new(NullSink),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(results[0].rows_written, 2);
    let committed = committed.lock().unwrap();
    assert_eq!(committed["p0"][0][0], Value::Int(1));
    assert_eq!(committed["p0"][1][0], Value::Int(3));
}

#[tokio::test]
async fn multi_batch_partition_commits_in_pull_order() {
    let committed = Arc::new(Mutex::new(HashMap::new()));
    let rows: Vec<Vec<Value>> = (0..25)
        .map(|i| vec![Value::Int(i), Value::Str(format!("u{i}@x.com"))])
        .collect();
    let factory = Arc::new(FixtureFactory {
        data: HashMap::from([("p0".to_string(), rows)]),
        columns: vec!["id".to_string(), "email".to_string()],
        cursor_col: None,
        committed: committed.clone(),
    });

    let mut config = base_config("batch-order-test");
    config.batch_size = 10;
    let plan = Arc::new(PipelinePlan {
        config,
        mapping: user_mapping(),
        ops: vec![],
        rules: vec![],
    });

    let results = run_parallel(
        plan,
        vec![PartitionSpec::new("p0")],
        factory,
        Arc::new(MemoryWatermarkStore::new()),
        Arc::new(NullSink),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(results[0].batches_committed, 3);
    assert_eq!(results[0].rows_written, 25);

    let committed = committed.lock().unwrap();
    let ids: Vec<i64> = committed["p0"]
        .iter()
        .map(|row| match row[0] {
            Value::Int(v) => v,
            _ => panic!("unexpected value"),
        })
        .collect();
    let expected: Vec<i64> = (0..25).collect();
    assert_eq!(ids, expected);
}
