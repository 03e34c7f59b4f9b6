//! Siphon Transport - The ingestion core
//!
//! Drives one declarative job end to end: fetch every configured endpoint
//! concurrently and transactionally upsert the decoded payloads into every
//! configured storage backend.
//!
//! # Architecture
//!
//! ```text
//! Config ──> Upsert ──plan──> [FlattenedRequest] ──┐
//!                                                  ▼
//!            RateLimiter <──acquire── [Web workers] ──RepoJob──> [Repo workers]
//!                                                                 │ encode (Registry)
//!                                                                 ▼
//!                                      Txn driver (per backend) <─transact─┘
//!                                                 │
//!                              Upsert ──commit/rollback──> backends
//! ```
//!
//! # Key Design
//!
//! - **Bounded pools**: both stages size to the CPU count, capping
//!   concurrent connections and sessions; channel backpressure throttles
//!   fetching when storage is slower than the network
//! - **One rate limiter**: a single token bucket spans every fetch, so
//!   timeseries fan-out cannot exceed the account budget
//! - **Single-writer transactions**: workers submit operations through a
//!   channel; one driver per backend applies them in submission order
//! - **Fail fast**: the first fetch/encode/upsert error cancels the job,
//!   rolls back every backend and surfaces as a typed `TransportError`
//! - **Partial commit**: commits run in `dnsList` order and are not
//!   reversed when a later backend fails (documented on `Upsert::run`)

mod error;
mod plan;
mod timeseries;
mod upsert;
mod worker;

pub use error::{Result, TransportError};
pub use timeseries::{Chunk, expand};
pub use upsert::{RepositoryFactory, Upsert, upsert};

// Re-export the job-facing types from the sibling crates for convenience.
pub use siphon_config::Config;
pub use siphon_encode::Registry;
pub use tokio_util::sync::CancellationToken;
