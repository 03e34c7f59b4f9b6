//! Canonical upsert record and the storage-facing request/response types.

use serde::{Deserialize, Serialize};

/// A table-tagged, decoded payload produced by an encoder.
///
/// One `Record` is produced per fetched response and fanned out to every
/// configured backend. The `table` is derived by the encoder (typically from
/// the request URL) and may be overridden by the request's `table` field
/// before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Destination table or collection name.
    pub table: String,

    /// Decoded rows. Each row is an arbitrary JSON object; backends map the
    /// fields onto their own storage model.
    pub rows: Vec<serde_json::Value>,
}

impl Record {
    /// Create a record for the given table.
    pub fn new(table: impl Into<String>, rows: Vec<serde_json::Value>) -> Self {
        Self {
            table: table.into(),
            rows,
        }
    }
}

/// Result counts reported by a backend for a single upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Rows that were newly inserted.
    pub upserted_count: u64,

    /// Rows that matched an existing key and were updated in place.
    pub matched_count: u64,
}

/// The set of tables to clear before ingestion starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TruncateRequest {
    /// Table names to truncate. Deduplicated by the caller.
    pub tables: Vec<String>,
}

impl TruncateRequest {
    /// Create a truncate request for the given tables.
    pub fn new(tables: Vec<String>) -> Self {
        Self { tables }
    }
}
