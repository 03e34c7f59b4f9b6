//! Authentication configuration
//!
//! A job authenticates against the remote API with at most one credential
//! set: an API key triple (key, passphrase, secret) for HMAC-signed
//! requests, or an OAuth2 bearer token. When neither section is present the
//! HTTP client is built unauthenticated.

use serde::Deserialize;

/// Credential information used to construct the HTTP client.
///
/// # Example
///
/// ```toml
/// [authentication.apiKey]
/// key = "d0d72b5c"
/// passphrase = "hunter2"
/// secret = "c2VjcmV0"
/// ```
///
/// or
///
/// ```toml
/// [authentication.auth2]
/// bearer = "token"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Authentication {
    /// API-key credentials (HMAC request signing).
    pub api_key: Option<ApiKeyAuth>,

    /// OAuth2 bearer token.
    pub auth2: Option<BearerAuth>,
}

impl Authentication {
    /// Whether any credential set is configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() || self.auth2.is_some()
    }
}

/// API-key credentials: passphrase, key and base64 secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyAuth {
    /// Account passphrase, sent verbatim in a header.
    pub passphrase: String,

    /// API key identifier.
    pub key: String,

    /// Base64-encoded signing secret.
    pub secret: String,
}

/// OAuth2 bearer token credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct BearerAuth {
    /// The bearer token, sent as `Authorization: Bearer <token>`.
    pub bearer: String,
}
