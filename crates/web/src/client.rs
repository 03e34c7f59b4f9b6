//! HTTP client construction
//!
//! One `Client` is built per job from the configured signer and reused by
//! every fetch; connection pooling is delegated to `reqwest`.

use std::time::Duration;

use crate::auth::Signer;
use crate::error::{Result, WebError};

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated HTTP client shared by all fetches in a job
///
/// Safe for concurrent use; the underlying `reqwest::Client` is an `Arc`
/// around a connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) http: reqwest::Client,
    pub(crate) signer: Signer,
}

impl Client {
    /// Create a client with the given signer
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed (e.g. TLS
    /// or proxy misconfiguration).
    pub fn new(signer: Signer) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("siphon/", env!("CARGO_PKG_VERSION")))
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(WebError::ClientBuild)?;

        Ok(Self { http, signer })
    }

    /// Create an unauthenticated client
    pub fn unauthenticated() -> Result<Self> {
        Self::new(Signer::None)
    }
}
