//! In-process reference backend
//!
//! `memory://<name>` sessions share a named, process-wide store, so a
//! committed transaction is observable from later sessions (and from
//! tests) the way a real backend would be. Rows upsert by their `id`
//! field when present and append otherwise.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use siphon_protocol::{Record, TruncateRequest, UpsertSummary};

use crate::error::Result;
use crate::repository::{Repository, Scheme};

type Table = Vec<Value>;
type Store = HashMap<String, Table>;
type SharedStore = Arc<Mutex<Store>>;

/// Named stores, keyed by the full DNS string
static STORES: LazyLock<Mutex<HashMap<String, SharedStore>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn named_store(dns: &str) -> SharedStore {
    let mut stores = STORES.lock();
    Arc::clone(stores.entry(dns.to_string()).or_default())
}

/// One transaction-scoped session on a named in-process store
///
/// Upserts stage copy-on-write table snapshots; `commit` publishes them to
/// the shared store and `rollback` drops them. `truncate` is immediate
/// pre-ingestion housekeeping and bypasses staging.
#[derive(Debug)]
pub struct MemoryRepository {
    store: SharedStore,
    staged: HashMap<String, Table>,
}

impl MemoryRepository {
    /// Attach a new session to the store named by `dns`
    pub fn open(dns: &str) -> Self {
        Self {
            store: named_store(dns),
            staged: HashMap::new(),
        }
    }

    /// Copy of the committed tables behind `dns`
    ///
    /// Observability hook for tests and demos.
    pub fn snapshot(dns: &str) -> Store {
        named_store(dns).lock().clone()
    }

    /// Drop all committed data behind `dns`
    pub fn reset(dns: &str) {
        named_store(dns).lock().clear();
    }

    /// Staged view of a table, seeded from committed rows on first touch
    fn staged_table(&mut self, table: &str) -> &mut Table {
        self.staged.entry(table.to_string()).or_insert_with(|| {
            self.store
                .lock()
                .get(table)
                .cloned()
                .unwrap_or_default()
        })
    }
}

/// Upsert key for a row: its `id` field, when one is present
fn row_key(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    fn kind(&self) -> Scheme {
        Scheme::Memory
    }

    async fn upsert(&mut self, record: &Record) -> Result<UpsertSummary> {
        let table = self.staged_table(&record.table);
        let mut summary = UpsertSummary::default();

        for row in &record.rows {
            let matched = row_key(row)
                .and_then(|key| table.iter().position(|r| row_key(r).as_deref() == Some(&key)));

            match matched {
                Some(index) => {
                    table[index] = row.clone();
                    summary.matched_count += 1;
                }
                None => {
                    table.push(row.clone());
                    summary.upserted_count += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn truncate(&mut self, request: &TruncateRequest) -> Result<()> {
        let mut committed = self.store.lock();
        for table in &request.tables {
            committed.remove(table);
            self.staged.remove(table);
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut committed = self.store.lock();
        for (table, rows) in self.staged.drain() {
            committed.insert(table, rows);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.staged.clear();
        Ok(())
    }
}
