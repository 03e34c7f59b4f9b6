//! Siphon Configuration
//!
//! TOML-based job configuration. A job declares a base URL, an
//! authentication scheme, a job-wide rate limit, a list of storage backend
//! connection strings and the endpoint requests to fetch.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse a configuration:
//!
//! ```
//! use siphon_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(
//!     "url = \"https://api.example.com\"\ndnsList = [\"memory://main\"]",
//! )
//! .unwrap();
//! assert_eq!(config.dns_list.len(), 1);
//! ```
//!
//! # Example Job
//!
//! ```toml
//! url = "https://api.exchange.test"
//! dnsList = ["memory://main"]
//! truncate = true
//!
//! [authentication.apiKey]
//! key = "d0d72b5c"
//! passphrase = "hunter2"
//! secret = "c2VjcmV0"
//!
//! [rateLimit]
//! burst = 10
//! period = "1s"
//!
//! [[requests]]
//! endpoint = "/products/BTC-USD/candles?start=2024-01-01T00:00:00Z&end=2024-01-02T00:00:00Z"
//! table = "candles"
//!
//! [requests.timeseries]
//! startName = "start"
//! endName = "end"
//! period = 3600
//! ```

mod auth;
mod error;
mod limits;
mod request;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use auth::{ApiKeyAuth, Authentication, BearerAuth};
pub use error::{ConfigError, Result};
pub use limits::RateLimitConfig;
pub use request::{RequestConfig, TimeseriesConfig};

/// A complete ingestion job configuration.
///
/// Semantic validation (a present and positive rate limit, parseable
/// timeseries windows) happens in the transport layer before any I/O; this
/// type only captures the declared shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the remote API.
    pub url: String,

    /// Credentials for the HTTP client. Absent sections mean an
    /// unauthenticated client.
    #[serde(default)]
    pub authentication: Authentication,

    /// Storage backend connection strings, one per backend. The scheme
    /// prefix selects the driver (e.g. `memory://main`).
    #[serde(default)]
    pub dns_list: Vec<String>,

    /// Endpoint requests to fetch.
    #[serde(default)]
    pub requests: Vec<RequestConfig>,

    /// Job-wide rate limit. Required by the pipeline; optional here so the
    /// transport layer can report its absence precisely.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    /// Truncate every referenced table on every backend before ingesting.
    #[serde(default)]
    pub truncate: bool,
}

impl Config {
    /// Load a job configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
