//! Siphon Web - Authenticated HTTP fetching under a shared rate limit
//!
//! This crate owns the outbound half of the pipeline:
//! - `Signer` - credential application (API-key HMAC or OAuth2 bearer)
//! - `Client` - a `reqwest` client constructed once per job
//! - `FetchConfig` - an immutable descriptor for one HTTP call, built by
//!   joining the job's base URL with an endpoint and overlaying query
//!   parameters
//! - `RateLimiter` - a token bucket shared by every fetch in a job
//!
//! # Design
//!
//! A job builds one `Client` and one `RateLimiter`, then one `FetchConfig`
//! per concrete HTTP call. `FetchConfig::fetch` blocks on the limiter,
//! signs the request and treats any non-2xx status as an error: the
//! pipeline fails fast and leaves retrying to the caller.

mod auth;
mod client;
mod error;
mod fetch;
mod ratelimit;

pub use auth::Signer;
pub use client::Client;
pub use error::{Result, WebError};
pub use fetch::FetchConfig;
pub use ratelimit::RateLimiter;

// Re-export the types callers need to construct and inspect fetches.
pub use reqwest::Method;
pub use url::Url;
