//! Platform adapter seam.
//!
//! The client stays agnostic of how credentials and endpoints are provisioned.
//! A [`PlatformAdapter`] resolves the live WebSocket URL, an optional bearer
//! token, and the canonical model identifier. Two stock adapters cover the
//! common backends: API-key auth with the key in the query string, and
//! token-based auth with an `Authorization: Bearer` header.

use crate::error::{LiveError, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Default Gemini Live WebSocket endpoint.
pub const LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Resolves connection parameters for a live session.
///
/// Implementations are provided by the host platform (API-key, OAuth/ADC,
/// proxy endpoints, ...). The session only consumes this trait.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Bearer token attached to the connection request, if any.
    async fn access_token(&self) -> Result<Option<SecretString>>;

    /// WebSocket endpoint for the live service.
    fn live_url(&self) -> String;

    /// Canonical, namespaced model identifier (e.g. `models/...`).
    fn resolve_model(&self, name: &str) -> String;
}

/// Adapter for API-key backends. The key travels in the URL query string;
/// no Authorization header is sent.
pub struct ApiKeyAdapter {
    api_key: SecretString,
    endpoint: String,
}

impl ApiKeyAdapter {
    /// Create an adapter for the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: SecretString::from(api_key.into()), endpoint: LIVE_URL.to_string() }
    }

    /// Override the endpoint (useful for proxies and tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl PlatformAdapter for ApiKeyAdapter {
    async fn access_token(&self) -> Result<Option<SecretString>> {
        Ok(None)
    }

    fn live_url(&self) -> String {
        match Url::parse(&self.endpoint) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("key", self.api_key.expose_secret());
                url.to_string()
            }
            // Leave malformed endpoints untouched; the connect path reports
            // the real error with the transport's diagnostics.
            Err(_) => self.endpoint.clone(),
        }
    }

    fn resolve_model(&self, name: &str) -> String {
        if name.contains('/') { name.to_string() } else { format!("models/{name}") }
    }
}

/// Adapter for token-based backends (e.g. OAuth/ADC). The token is attached
/// as an `Authorization: Bearer` header by the connection manager.
pub struct BearerTokenAdapter {
    token: SecretString,
    endpoint: String,
}

impl BearerTokenAdapter {
    /// Create an adapter with a pre-resolved token and endpoint.
    pub fn new(token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self { token: SecretString::from(token.into()), endpoint: endpoint.into() }
    }
}

#[async_trait]
impl PlatformAdapter for BearerTokenAdapter {
    async fn access_token(&self) -> Result<Option<SecretString>> {
        if self.token.expose_secret().is_empty() {
            return Err(LiveError::auth("empty access token"));
        }
        Ok(Some(self.token.clone()))
    }

    fn live_url(&self) -> String {
        self.endpoint.clone()
    }

    fn resolve_model(&self, name: &str) -> String {
        if name.contains('/') { name.to_string() } else { format!("models/{name}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_key_in_query_string() {
        let adapter = ApiKeyAdapter::new("secret-key");
        let url = adapter.live_url();
        assert!(url.starts_with(LIVE_URL));
        assert!(url.contains("key=secret-key"));
        assert!(adapter.access_token().await.unwrap().is_none());
    }

    #[test]
    fn test_resolve_model_namespaces_bare_names() {
        let adapter = ApiKeyAdapter::new("k");
        assert_eq!(adapter.resolve_model("gemini-2.0-flash-live"), "models/gemini-2.0-flash-live");
        assert_eq!(adapter.resolve_model("models/gemini-2.0-flash-live"), "models/gemini-2.0-flash-live");
        assert_eq!(adapter.resolve_model("projects/p/models/m"), "projects/p/models/m");
    }

    #[tokio::test]
    async fn test_bearer_adapter_rejects_empty_token() {
        let adapter = BearerTokenAdapter::new("", LIVE_URL);
        assert!(adapter.access_token().await.is_err());

        let adapter = BearerTokenAdapter::new("tok", LIVE_URL);
        let token = adapter.access_token().await.unwrap().unwrap();
        assert_eq!(token.expose_secret(), "tok");
    }
}
