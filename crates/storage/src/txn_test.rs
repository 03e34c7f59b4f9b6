//! Transaction multiplexer tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use siphon_protocol::{Record, TruncateRequest, UpsertSummary};

use crate::memory::MemoryRepository;
use crate::repository::{Repository, Scheme};
use crate::txn::Txn;
use crate::{Result, StorageError};

/// Repository double that records every call into a shared log
struct RecordingRepository {
    log: Arc<Mutex<Vec<String>>>,
    fail_upserts: bool,
    fail_commit: bool,
}

impl RecordingRepository {
    fn new(log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            log,
            fail_upserts: false,
            fail_commit: false,
        }
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }
}

#[async_trait]
impl Repository for RecordingRepository {
    fn kind(&self) -> Scheme {
        Scheme::Memory
    }

    async fn upsert(&mut self, record: &Record) -> Result<UpsertSummary> {
        if self.fail_upserts {
            return Err(StorageError::upsert("injected failure"));
        }
        self.record(format!("upsert:{}", record.table));
        Ok(UpsertSummary::default())
    }

    async fn truncate(&mut self, request: &TruncateRequest) -> Result<()> {
        self.record(format!("truncate:{}", request.tables.join(",")));
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if self.fail_commit {
            return Err(StorageError::commit("injected failure"));
        }
        self.record("commit");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.record("rollback");
        Ok(())
    }
}

fn upsert_op(
    table: &str,
) -> impl for<'a> FnOnce(
    &'a mut (dyn Repository + 'static),
) -> futures::future::BoxFuture<'a, Result<()>>
+ Send
+ 'static {
    let record = Record::new(table, vec![json!({"id": 1})]);
    move |repo: &mut (dyn Repository + 'static)| {
        Box::pin(async move {
            repo.upsert(&record).await?;
            Ok(())
        })
    }
}

#[tokio::test]
async fn applies_operations_in_submission_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let repo = RecordingRepository::new(Arc::clone(&log));
    let (txn, handle) = Txn::open("memory://order", Box::new(repo), 16);

    for table in ["a", "b", "c", "d"] {
        handle.transact(upsert_op(table)).await.unwrap();
    }
    drop(handle);

    txn.commit().await.unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["upsert:a", "upsert:b", "upsert:c", "upsert:d", "commit"]
    );
}

#[tokio::test]
async fn rollback_skips_commit() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let repo = RecordingRepository::new(Arc::clone(&log));
    let (txn, handle) = Txn::open("memory://rollback", Box::new(repo), 16);

    handle.transact(upsert_op("a")).await.unwrap();
    drop(handle);

    txn.rollback().await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["upsert:a", "rollback"]);
}

#[tokio::test]
async fn failed_operation_poisons_the_transaction() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut repo = RecordingRepository::new(Arc::clone(&log));
    repo.fail_upserts = true;
    let (txn, handle) = Txn::open("memory://poison", Box::new(repo), 16);

    handle.transact(upsert_op("a")).await.unwrap();
    handle.transact(upsert_op("b")).await.unwrap();
    drop(handle);

    let err = txn.commit().await.unwrap_err();
    assert!(matches!(err, StorageError::Upsert(_)));
    // Nothing applied, session rolled back instead of committed.
    assert_eq!(*log.lock().unwrap(), vec!["rollback"]);
}

#[tokio::test]
async fn commit_failure_is_reported() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut repo = RecordingRepository::new(Arc::clone(&log));
    repo.fail_commit = true;
    let (txn, handle) = Txn::open("memory://commit-fail", Box::new(repo), 16);
    drop(handle);

    let err = txn.commit().await.unwrap_err();
    assert!(matches!(err, StorageError::Commit(_)));
}

#[tokio::test]
async fn truncate_is_acknowledged_and_ordered_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let repo = RecordingRepository::new(Arc::clone(&log));
    let (txn, handle) = Txn::open("memory://truncate-order", Box::new(repo), 16);

    handle
        .truncate(&TruncateRequest::new(vec!["x".to_string(), "y".to_string()]))
        .await
        .unwrap();
    handle.transact(upsert_op("x")).await.unwrap();
    drop(handle);

    txn.commit().await.unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["truncate:x,y", "upsert:x", "commit"]
    );
}

#[tokio::test]
async fn concurrent_submissions_all_arrive() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let repo = RecordingRepository::new(Arc::clone(&log));
    let (txn, handle) = Txn::open("memory://concurrent", Box::new(repo), 64);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle.transact(upsert_op(&format!("t{i}"))).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    drop(handle);

    txn.commit().await.unwrap();
    let entries = log.lock().unwrap();
    assert_eq!(entries.len(), 9); // 8 upserts + commit
    assert_eq!(entries.last().unwrap(), "commit");
}

#[tokio::test]
async fn memory_backed_commit_round_trip() {
    MemoryRepository::reset("memory://txn-roundtrip");
    let repo = MemoryRepository::open("memory://txn-roundtrip");
    let (txn, handle) = Txn::open("memory://txn-roundtrip", Box::new(repo), 16);

    handle.transact(upsert_op("trades")).await.unwrap();
    drop(handle);
    txn.commit().await.unwrap();

    let snapshot = MemoryRepository::snapshot("memory://txn-roundtrip");
    assert_eq!(snapshot.get("trades").unwrap().len(), 1);
}
