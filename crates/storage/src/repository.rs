//! Repository trait and driver factory
//!
//! A `Repository` is one scoped backend session: it stages upserts until
//! `commit` and can discard them with `rollback`. The factory parses the
//! scheme prefix of a DNS string and constructs the matching driver.
//! External drivers plug in above this crate by injecting their own factory
//! into the orchestrator.

use async_trait::async_trait;
use siphon_protocol::{Record, TruncateRequest, UpsertSummary};

use crate::error::{Result, StorageError};
use crate::memory::MemoryRepository;

/// Backend class, parsed from the DNS scheme prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// In-process store (`memory://<name>`)
    Memory,
}

impl Scheme {
    /// Parse the scheme prefix of a DNS string
    ///
    /// # Errors
    ///
    /// Returns `UnknownScheme` when the prefix is missing or unrecognized.
    pub fn parse(dns: &str) -> Result<Self> {
        let scheme = dns
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| StorageError::UnknownScheme {
                dns: dns.to_string(),
            })?;

        match scheme {
            "memory" => Ok(Self::Memory),
            _ => Err(StorageError::UnknownScheme {
                dns: dns.to_string(),
            }),
        }
    }

    /// Scheme name as it appears in DNS strings and log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scoped session on a storage backend
///
/// Sessions are single-writer: the transaction driver owns the session and
/// applies operations in submission order. `upsert` and `truncate` stage
/// work; exactly one of `commit` or `rollback` finalizes it.
#[async_trait]
pub trait Repository: Send {
    /// The backend class of this session.
    fn kind(&self) -> Scheme;

    /// Stage an upsert of `record.rows` into `record.table`.
    async fn upsert(&mut self, record: &Record) -> Result<UpsertSummary>;

    /// Clear the listed tables. Takes effect immediately, outside the
    /// staged transaction (pre-ingestion housekeeping).
    async fn truncate(&mut self, request: &TruncateRequest) -> Result<()>;

    /// Apply all staged work.
    async fn commit(&mut self) -> Result<()>;

    /// Discard all staged work.
    async fn rollback(&mut self) -> Result<()>;
}

/// Open a repository session for a DNS string
///
/// # Errors
///
/// Returns `UnknownScheme` for unrecognized prefixes, or a driver error
/// when the session cannot be established.
pub async fn connect(dns: &str) -> Result<Box<dyn Repository>> {
    match Scheme::parse(dns)? {
        Scheme::Memory => Ok(Box::new(MemoryRepository::open(dns))),
    }
}
