//! Klaviyo API client for segment membership.
//!
//! Provides read access to Klaviyo segments: segment metadata and the
//! cursor-paginated list of profiles in a segment.
//!
//! # API Reference
//!
//! - Base URL: `https://a.klaviyo.com/api`
//! - Authentication: Private API key via `Authorization: Klaviyo-API-Key <key>`
//! - API Version: specified via `revision` header (default `2024-10-15`)
//! - Pagination: opaque `page[cursor]` embedded in `links.next`

mod segments;
mod types;

pub use segments::*;
pub use types::*;

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use crate::config::KlaviyoConfig;

/// Errors that can occur when interacting with Klaviyo API.
#[derive(Debug, Error)]
pub enum KlaviyoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by Klaviyo.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to parse response or build a request URL.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unauthorized (invalid API key).
    #[error("Unauthorized: invalid API key")]
    Unauthorized,
}

/// Klaviyo API client.
#[derive(Clone)]
pub struct KlaviyoClient {
    inner: Arc<KlaviyoClientInner>,
}

struct KlaviyoClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl KlaviyoClient {
    /// Create a new Klaviyo API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &KlaviyoConfig) -> Result<Self, KlaviyoError> {
        let mut headers = HeaderMap::new();

        // Authorization header
        let auth_value = format!("Klaviyo-API-Key {}", config.api_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| KlaviyoError::Parse(format!("Invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        // Revision header for API versioning
        headers.insert(
            "revision",
            HeaderValue::from_str(&config.revision)
                .map_err(|e| KlaviyoError::Parse(format!("Invalid API revision: {e}")))?,
        );

        // JSON:API responses
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.api+json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(KlaviyoClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Build an absolute endpoint URL from an API path.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, KlaviyoError> {
        Url::parse(&format!("{}{path}", self.inner.base_url))
            .map_err(|e| KlaviyoError::Parse(format!("Invalid endpoint URL: {e}")))
    }

    /// Execute a GET request to the Klaviyo API.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, KlaviyoError> {
        let response = self.inner.client.get(url).send().await?;
        Self::handle_response(response).await
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, KlaviyoError> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return serde_json::from_slice(&body)
                .map_err(|e| KlaviyoError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Parse error response from Klaviyo API.
    async fn parse_error(response: reqwest::Response) -> KlaviyoError {
        let status = response.status().as_u16();

        // Check for rate limiting
        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return KlaviyoError::RateLimited(retry_after);
        }

        // Check for unauthorized
        if status == 401 || status == 403 {
            return KlaviyoError::Unauthorized;
        }

        // Check for not found
        if status == 404 {
            return KlaviyoError::NotFound(response.url().path().to_string());
        }

        // Try to parse error message from response body
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        KlaviyoError::Api { status, message }
    }
}

impl std::fmt::Debug for KlaviyoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlaviyoClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::{DEFAULT_KLAVIYO_BASE_URL, DEFAULT_KLAVIYO_REVISION};

    fn config() -> KlaviyoConfig {
        KlaviyoConfig {
            api_key: SecretString::from("pk_9f8e7d6c5b4a"),
            segment_id: "SEG1".to_string(),
            revision: DEFAULT_KLAVIYO_REVISION.to_string(),
            base_url: format!("{DEFAULT_KLAVIYO_BASE_URL}/"),
        }
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = KlaviyoClient::new(&config()).unwrap();
        let url = client.endpoint("/segments/SEG1/").unwrap();
        assert_eq!(url.as_str(), "https://a.klaviyo.com/api/segments/SEG1/");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = KlaviyoClient::new(&config()).unwrap();
        assert!(!format!("{client:?}").contains("pk_9f8e7d6c5b4a"));
    }

    #[test]
    fn test_rate_limited_error_display() {
        let err = KlaviyoError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
    }
}
