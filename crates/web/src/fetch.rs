//! Fetch descriptors
//!
//! A `FetchConfig` is the immutable description of one concrete HTTP call:
//! method, fully-resolved URL, the job's client and the job's rate limiter.
//! Building one joins the job base URL with the request endpoint and
//! overlays the request's query parameters; request-level keys win over
//! parameters already present on the endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use reqwest::Method;
use url::Url;

use crate::client::Client;
use crate::error::{Result, WebError};
use crate::ratelimit::RateLimiter;

/// Immutable descriptor for one HTTP call
#[derive(Debug, Clone)]
pub struct FetchConfig {
    client: Arc<Client>,
    method: Method,
    url: Url,
    limiter: Arc<RateLimiter>,
}

impl FetchConfig {
    /// Build a fetch descriptor from the job base URL and a request
    ///
    /// Joins `base` and `endpoint` with single-slash discipline, parses the
    /// result and overlays `query` onto any parameters the endpoint already
    /// carries (request keys replace endpoint keys; everything else keeps
    /// its order).
    ///
    /// # Errors
    ///
    /// Returns `WebError::InvalidUrl` when the joined string is not a valid
    /// URL.
    pub fn build(
        base: &str,
        endpoint: &str,
        query: &BTreeMap<String, String>,
        method: Method,
        client: Arc<Client>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let joined = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)
            .map_err(|source| WebError::invalid_url(base, endpoint, source))?;

        if !query.is_empty() {
            let merged: Vec<(String, String)> = url
                .query_pairs()
                .into_owned()
                .filter(|(name, _)| !query.contains_key(name))
                .chain(query.iter().map(|(n, v)| (n.clone(), v.clone())))
                .collect();

            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (name, value) in &merged {
                pairs.append_pair(name, value);
            }
            drop(pairs);
        }

        Ok(Self {
            client,
            method,
            url,
            limiter,
        })
    }

    /// The fully-resolved request URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The request method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Perform the described HTTP call
    ///
    /// Blocks on the shared rate limiter, signs the request and sends it.
    /// Any transport failure or non-2xx status is an error; the pipeline
    /// has no retry layer, callers re-invoke the whole job instead.
    pub async fn fetch(&self) -> Result<reqwest::Response> {
        self.limiter.acquire().await;

        let started = Instant::now();
        let builder = self
            .client
            .http
            .request(self.method.clone(), self.url.clone());
        let builder = self.client.signer.apply(builder, &self.method, &self.url)?;

        let response = builder.send().await.map_err(|source| WebError::Request {
            url: self.url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebError::Status {
                url: self.url.to_string(),
                status,
            });
        }

        tracing::debug!(
            method = %self.method,
            path = %self.url.path(),
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetch completed"
        );

        Ok(response)
    }
}

#[cfg(test)]
#[path = "fetch_test.rs"]
mod fetch_test;
