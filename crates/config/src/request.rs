//! Endpoint request configuration
//!
//! Each request describes one endpoint to fetch. A request carrying a
//! `timeseries` section is expanded by the planner into one fetch per time
//! chunk, with the start/end query parameters rewritten per chunk.

use std::collections::BTreeMap;

use serde::Deserialize;

/// One endpoint to query for data to ingest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    /// HTTP method. Defaults to GET when absent.
    #[serde(default)]
    pub method: Option<String>,

    /// URL fragment joined onto the job's base URL. May itself carry query
    /// parameters.
    pub endpoint: String,

    /// Advisory per-endpoint burst cap from the remote API's documentation.
    /// Informational only; the job-wide rate limit governs actual pacing.
    #[serde(default, rename = "ratelimit")]
    pub rate_limit_burst_cap: Option<u32>,

    /// Query parameters overlaid onto the endpoint URL. Request-level keys
    /// win over parameters already present on the endpoint.
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    /// Timeseries expansion. When present, the request fans out into one
    /// fetch per chunk of the configured window.
    #[serde(default)]
    pub timeseries: Option<TimeseriesConfig>,

    /// Destination table override. When absent the encoder derives the
    /// table from the request URL.
    #[serde(default)]
    pub table: Option<String>,
}

/// How to partition a request's time window into chunked fetches.
///
/// The window itself is read from the request's query parameters named by
/// `start_name` and `end_name`; `period` is the chunk size in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesConfig {
    /// Query parameter carrying the window start.
    pub start_name: String,

    /// Query parameter carrying the window end.
    pub end_name: String,

    /// Chunk length in seconds. The final chunk is clipped at the window
    /// end.
    pub period: i64,

    /// Timestamp layout (chrono format string) for parsing and re-formatting
    /// the start/end values. Defaults to RFC 3339.
    #[serde(default)]
    pub layout: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_with_timeseries() {
        let toml = r#"
endpoint = "/products/BTC-USD/candles"
table = "candles"
ratelimit = 10

[query]
granularity = "60"

[timeseries]
startName = "start"
endName = "end"
period = 3600
"#;
        let req: RequestConfig = toml::from_str(toml).unwrap();
        assert_eq!(req.endpoint, "/products/BTC-USD/candles");
        assert_eq!(req.table.as_deref(), Some("candles"));
        assert_eq!(req.rate_limit_burst_cap, Some(10));
        assert_eq!(req.query.get("granularity").unwrap(), "60");

        let ts = req.timeseries.unwrap();
        assert_eq!(ts.start_name, "start");
        assert_eq!(ts.end_name, "end");
        assert_eq!(ts.period, 3600);
        assert!(ts.layout.is_none());
    }

    #[test]
    fn method_defaults_to_none() {
        let req: RequestConfig = toml::from_str(r#"endpoint = "/v1/accounts""#).unwrap();
        assert!(req.method.is_none());
        assert!(req.query.is_empty());
        assert!(req.timeseries.is_none());
    }
}
