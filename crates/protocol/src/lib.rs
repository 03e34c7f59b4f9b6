//! Siphon Protocol - Shared record types for the siphon pipeline
//!
//! This crate provides the canonical types that flow between the fetch
//! stage, the encoders and the storage backends:
//! - `Record` - a table-tagged, decoded payload ready for upserting
//! - `UpsertSummary` - per-upsert result counts reported by a backend
//! - `TruncateRequest` - the set of tables to clear before ingestion

mod record;

pub use record::{Record, TruncateRequest, UpsertSummary};
