//! Web error types

use thiserror::Error;

/// Result type for web operations
pub type Result<T> = std::result::Result<T, WebError>;

/// Errors that can occur while building clients or fetching data
#[derive(Debug, Error)]
pub enum WebError {
    /// Failed to construct the HTTP client
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The base URL and endpoint did not join into a valid URL
    #[error("error joining url {base:?} to endpoint {endpoint:?}: {source}")]
    InvalidUrl {
        /// Job base URL
        base: String,
        /// Request endpoint fragment
        endpoint: String,
        /// Underlying parse error
        #[source]
        source: url::ParseError,
    },

    /// The API-key secret is not valid base64
    #[error("invalid api key secret: {0}")]
    InvalidSecret(String),

    /// The request failed at the transport level
    #[error("request to {url} failed: {source}")]
    Request {
        /// Request URL
        url: String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("request to {url} returned status {status}")]
    Status {
        /// Request URL
        url: String,
        /// Response status code
        status: reqwest::StatusCode,
    },
}

impl WebError {
    /// Create an InvalidUrl error
    pub fn invalid_url(
        base: impl Into<String>,
        endpoint: impl Into<String>,
        source: url::ParseError,
    ) -> Self {
        Self::InvalidUrl {
            base: base.into(),
            endpoint: endpoint.into(),
            source,
        }
    }
}
