//! Siphon Encode - Response encoder registry
//!
//! An `Encoder` turns one fetched response (the completed request URL plus
//! the raw body bytes) into a canonical upsert `Record`. The `Registry`
//! selects an encoder by longest URL prefix (host + path) and falls back to
//! a generic JSON passthrough encoder, so the worker pool never threads
//! encoder choice through the pipeline.
//!
//! The registry is built once before ingestion and is read-only afterwards;
//! workers share it through an `Arc`.

mod error;
mod json;
mod registry;

pub use error::{EncodeError, Result};
pub use json::JsonEncoder;
pub use registry::{Encoder, Registry};
