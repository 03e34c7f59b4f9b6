//! Encoder error types

use thiserror::Error;

/// Result type for encoding operations
pub type Result<T> = std::result::Result<T, EncodeError>;

/// Errors that can occur while encoding a response body
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The body is not valid JSON
    #[error("error decoding response from {url}: {source}")]
    Malformed {
        /// Completed request URL
        url: String,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// The body decoded, but not into rows
    #[error("unsupported payload from {url}: expected a JSON object or array")]
    UnsupportedPayload {
        /// Completed request URL
        url: String,
    },
}
