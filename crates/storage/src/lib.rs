//! Siphon Storage - Backend seam and transaction multiplexing
//!
//! This crate defines the storage half of the pipeline:
//! - `Repository` - the driver trait one backend session implements
//!   (`upsert`, `truncate`, `commit`, `rollback`)
//! - `Scheme` + `connect` - DNS-string parsing and the driver factory
//! - `Txn` / `TxnHandle` - a single-writer multiplexer that serializes
//!   concurrently submitted operations onto one session
//! - `MemoryRepository` - the in-process reference backend (`memory://`)
//!   used by tests and demos
//!
//! # Architecture
//!
//! ```text
//! [Repo workers] --transact(op)--> TxnHandle --+--> op channel --> [Driver task]
//! [Repo workers] --transact(op)--> TxnHandle --+                   owns Box<dyn Repository>
//!                                                                   applies ops FIFO
//! [Orchestrator] --commit()/rollback()--> Txn --decision-------->   finalizes, reports status
//! ```
//!
//! Backend sessions are typically not safe for concurrent writers; the
//! channel gives workers a fire-and-forget submission API while the driver
//! stays single-threaded.

mod error;
mod memory;
mod repository;
mod txn;

pub use error::{Result, StorageError};
pub use memory::MemoryRepository;
pub use repository::{Repository, Scheme, connect};
pub use txn::{Txn, TxnHandle, TxnOp};
