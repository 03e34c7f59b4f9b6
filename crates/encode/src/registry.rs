//! Encoder registry
//!
//! URL-to-encoder lookup. Encoders are registered under a `host/path`
//! prefix; lookup walks the registered prefixes and picks the longest one
//! matching the request URL, falling back to the JSON passthrough encoder.

use std::sync::Arc;

use siphon_protocol::Record;
use url::Url;

use crate::error::Result;
use crate::json::JsonEncoder;

/// Transforms one fetched response into an upsert record
pub trait Encoder: Send + Sync {
    /// Decode `body` (fetched from `url`) into a table-tagged record.
    fn encode(&self, url: &Url, body: &[u8]) -> Result<Record>;
}

/// URL-prefix keyed encoder lookup
///
/// Prefixes are matched against `host + path` of the request URL
/// (`api.test/products/...`), longest match wins. The registry is immutable
/// once handed to the pipeline.
pub struct Registry {
    entries: Vec<(String, Arc<dyn Encoder>)>,
    fallback: Arc<dyn Encoder>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Arc::new(JsonEncoder))
    }
}

impl Registry {
    /// Create a registry with the given fallback encoder
    pub fn new(fallback: Arc<dyn Encoder>) -> Self {
        Self {
            entries: Vec::new(),
            fallback,
        }
    }

    /// Register an encoder under a `host/path` prefix
    ///
    /// Later registrations of the same prefix shadow earlier ones.
    pub fn register(mut self, prefix: impl Into<String>, encoder: Arc<dyn Encoder>) -> Self {
        self.entries.insert(0, (prefix.into(), encoder));
        self
    }

    /// Look up the encoder for a request URL
    ///
    /// Returns the encoder registered under the longest matching prefix, or
    /// the fallback when nothing matches.
    pub fn lookup(&self, url: &Url) -> Arc<dyn Encoder> {
        let key = lookup_key(url);

        // Entries are newest-first, so on equal prefix length the newest
        // registration shadows the older one.
        let mut best: Option<&(String, Arc<dyn Encoder>)> = None;
        for entry in &self.entries {
            if key.starts_with(entry.0.as_str())
                && best.is_none_or(|(prefix, _)| entry.0.len() > prefix.len())
            {
                best = Some(entry);
            }
        }

        best.map(|(_, encoder)| Arc::clone(encoder))
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Number of registered (non-fallback) encoders
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether only the fallback encoder is present
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// The `host + path` string prefixes are matched against
fn lookup_key(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedEncoder(&'static str);

    impl Encoder for FixedEncoder {
        fn encode(&self, _url: &Url, _body: &[u8]) -> Result<Record> {
            Ok(Record::new(self.0, vec![json!({"from": self.0})]))
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn falls_back_without_registrations() {
        let registry = Registry::default();
        let record = registry
            .lookup(&url("https://api.test/v1/accounts"))
            .encode(&url("https://api.test/v1/accounts"), b"[]")
            .unwrap();
        assert_eq!(record.table, "accounts");
    }

    #[test]
    fn longest_prefix_wins() {
        let registry = Registry::default()
            .register("api.test/products", Arc::new(FixedEncoder("short")))
            .register("api.test/products/BTC-USD", Arc::new(FixedEncoder("long")));

        let chosen = registry.lookup(&url("https://api.test/products/BTC-USD/candles"));
        let record = chosen
            .encode(&url("https://api.test/products/BTC-USD/candles"), b"")
            .unwrap();
        assert_eq!(record.table, "long");

        let chosen = registry.lookup(&url("https://api.test/products/ETH-USD/ticker"));
        let record = chosen
            .encode(&url("https://api.test/products/ETH-USD/ticker"), b"")
            .unwrap();
        assert_eq!(record.table, "short");
    }

    #[test]
    fn unmatched_host_uses_fallback() {
        let registry =
            Registry::default().register("api.test/products", Arc::new(FixedEncoder("custom")));
        let record = registry
            .lookup(&url("https://other.test/products/x"))
            .encode(&url("https://other.test/products/x"), b"{}")
            .unwrap();
        assert_eq!(record.table, "x");
    }
}
