//! Transport error taxonomy
//!
//! The job-level error surface. Configuration and planning errors are
//! reported synchronously before any worker starts; runtime errors are
//! fatal to the whole job and surface here wrapped in their tier's
//! variant.

use siphon_encode::EncodeError;
use siphon_storage::StorageError;
use siphon_web::WebError;
use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors reported by the upsert orchestrator
#[derive(Debug, Error)]
pub enum TransportError {
    /// A required top-level configuration field is absent
    #[error("missing config field: {0}")]
    MissingConfigField(&'static str),

    /// The rate limit configuration is missing a field
    #[error("missing rate limit field: {0}")]
    MissingRateLimitField(&'static str),

    /// The rate limit configuration is present but unusable
    #[error("invalid rate limit configuration: {source}")]
    InvalidRateLimit {
        /// What makes it invalid
        #[source]
        source: Box<TransportError>,
    },

    /// A timeseries query parameter is absent (or ambiguous)
    #[error("missing timeseries field: {0}")]
    MissingTimeseriesField(&'static str),

    /// A value could not be parsed with the configured layout
    #[error("{0} unable to parse")]
    UnableToParse(&'static str),

    /// The timeseries window could not be partitioned into chunks
    #[error("failed to set timeseries chunks: {source}")]
    SettingTimeseriesChunks {
        /// Underlying planning error
        #[source]
        source: Box<TransportError>,
    },

    /// A per-chunk fetch descriptor could not be built
    #[error("failed to fetch timeseries chunks: {source}")]
    FetchingTimeseriesChunks {
        /// Underlying build error
        #[source]
        source: Box<TransportError>,
    },

    /// Web-layer failure (client construction, URL building, fetch)
    #[error("web: {0}")]
    Web(#[from] WebError),

    /// Storage-layer failure (session open, upsert submission)
    #[error("repository: {0}")]
    Repository(#[from] StorageError),

    /// A response body could not be encoded into a record
    #[error("encode: {0}")]
    Encode(#[from] EncodeError),

    /// Pre-ingestion truncate failed on one backend
    #[error("unable to truncate tables on {dns:?}: {source}")]
    Truncate {
        /// Backend connection string
        dns: String,
        /// Underlying storage error
        #[source]
        source: StorageError,
    },

    /// Commit failed on one backend; earlier backends stay committed
    #[error("unable to commit transaction on {dns:?}: {source}")]
    Commit {
        /// Backend connection string
        dns: String,
        /// Underlying storage error
        #[source]
        source: StorageError,
    },

    /// The job was cancelled before completing
    #[error("operation cancelled")]
    Cancelled,
}

impl TransportError {
    /// Wrap a planning error as a chunk-expansion failure
    pub(crate) fn setting_chunks(source: TransportError) -> Self {
        Self::SettingTimeseriesChunks {
            source: Box::new(source),
        }
    }

    /// Wrap a build error as a chunk-fetch failure
    pub(crate) fn fetching_chunks(source: TransportError) -> Self {
        Self::FetchingTimeseriesChunks {
            source: Box::new(source),
        }
    }

    /// Wrap a field error as an invalid rate limit configuration
    pub(crate) fn invalid_rate_limit(source: TransportError) -> Self {
        Self::InvalidRateLimit {
            source: Box::new(source),
        }
    }
}
