//! JSON passthrough encoder
//!
//! The default encoder: decodes the body as JSON, treats a top-level array
//! as the row set and a top-level object as a single row, and derives the
//! destination table from the final URL path segment. Requests that need a
//! different table name set an override in the job config instead of
//! registering a custom encoder.

use serde_json::Value;
use siphon_protocol::Record;
use url::Url;

use crate::error::{EncodeError, Result};
use crate::registry::Encoder;

/// Generic JSON-to-rows encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, url: &Url, body: &[u8]) -> Result<Record> {
        let value: Value =
            serde_json::from_slice(body).map_err(|source| EncodeError::Malformed {
                url: url.to_string(),
                source,
            })?;

        let rows = match value {
            Value::Array(rows) => rows,
            row @ Value::Object(_) => vec![row],
            _ => {
                return Err(EncodeError::UnsupportedPayload {
                    url: url.to_string(),
                });
            }
        };

        Ok(Record::new(table_from_url(url), rows))
    }
}

/// Derive a table name from the request URL
///
/// The last non-empty path segment, falling back to the host for bare
/// root requests.
fn table_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| url.host_str().unwrap_or("default").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn array_becomes_rows() {
        let record = JsonEncoder
            .encode(
                &url("https://api.test/v1/candles"),
                br#"[{"open": 1}, {"open": 2}]"#,
            )
            .unwrap();
        assert_eq!(record.table, "candles");
        assert_eq!(record.rows, vec![json!({"open": 1}), json!({"open": 2})]);
    }

    #[test]
    fn object_becomes_single_row() {
        let record = JsonEncoder
            .encode(&url("https://api.test/v1/account"), br#"{"id": "a"}"#)
            .unwrap();
        assert_eq!(record.rows.len(), 1);
    }

    #[test]
    fn malformed_body_errors() {
        let err = JsonEncoder
            .encode(&url("https://api.test/v1/x"), b"not json")
            .unwrap_err();
        assert!(matches!(err, EncodeError::Malformed { .. }));
        assert!(err.to_string().contains("api.test/v1/x"));
    }

    #[test]
    fn scalar_payload_is_rejected() {
        let err = JsonEncoder
            .encode(&url("https://api.test/v1/x"), b"42")
            .unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedPayload { .. }));
    }

    #[test]
    fn table_ignores_trailing_slash() {
        assert_eq!(
            table_from_url(&url("https://api.test/v1/trades/")),
            "trades"
        );
        assert_eq!(table_from_url(&url("https://api.test/")), "api.test");
    }
}
