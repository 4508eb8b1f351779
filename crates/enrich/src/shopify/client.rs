//! Shopify Admin REST API client.
//!
//! This module provides a small client for the two lookups the enricher
//! needs: customer search by email and the customer's most recent order.

use std::sync::Arc;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use segment_enrich_core::{CustomerId, Email};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ShopifyConfig;

use super::{Customer, CustomerSearchResponse, Order, OrderListResponse, ShopifyError};

/// Search results fetched per lookup; `email:` also matches partial addresses.
const CUSTOMER_SEARCH_LIMIT: u32 = 10;

/// Shopify Admin REST API client.
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ShopifyClientInner>,
}

struct ShopifyClientInner {
    client: reqwest::Client,
    store: String,
    api_base: String,
}

impl ShopifyClient {
    /// Create a new Admin API client.
    ///
    /// # Errors
    ///
    /// Returns error if the access token is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &ShopifyConfig) -> Result<Self, ShopifyError> {
        let mut headers = HeaderMap::new();

        let mut token = HeaderValue::from_str(config.access_token.expose_secret())
            .map_err(|e| ShopifyError::InvalidRequest(format!("Invalid access token: {e}")))?;
        token.set_sensitive(true);
        headers.insert("X-Shopify-Access-Token", token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(ShopifyClientInner {
                client,
                store: config.store.clone(),
                api_base: config.api_base(),
            }),
        })
    }

    /// Get the store domain.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.inner.store
    }

    /// Find the customer whose email matches `email`.
    ///
    /// Uses `customers/search.json?query=email:<email>` and returns the first
    /// result whose normalized email equals the requested one.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, is rate limited, or returns
    /// an unexpected payload.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn find_customer_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Customer>, ShopifyError> {
        let mut url = self.endpoint("customers/search.json")?;
        url.query_pairs_mut()
            .append_pair("query", &format!("email:{email}"))
            .append_pair("fields", "id,email,first_name,last_name")
            .append_pair("limit", &CUSTOMER_SEARCH_LIMIT.to_string());

        let response: CustomerSearchResponse = self.get(url).await?;

        let customer = response.customers.into_iter().find(|customer| {
            customer
                .email
                .as_deref()
                .and_then(|raw| Email::parse(raw).ok())
                .is_some_and(|found| &found == email)
        });

        if customer.is_none() {
            debug!("No customer matched email");
        }

        Ok(customer)
    }

    /// Get a customer's most recent order (any status).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, is rate limited, or returns
    /// an unexpected payload.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn latest_order(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<Order>, ShopifyError> {
        let mut url = self.endpoint("orders.json")?;
        url.query_pairs_mut()
            .append_pair("customer_id", &customer_id.to_string())
            .append_pair("status", "any")
            .append_pair("order", "created_at desc")
            .append_pair("fields", "id,created_at,line_items")
            .append_pair("limit", "1");

        let response: OrderListResponse = self.get(url).await?;
        Ok(response.orders.into_iter().next())
    }

    /// Build an absolute endpoint URL under the versioned Admin API base.
    fn endpoint(&self, path: &str) -> Result<Url, ShopifyError> {
        Url::parse(&format!("{}/{path}", self.inner.api_base))
            .map_err(|e| ShopifyError::InvalidRequest(format!("Invalid endpoint URL: {e}")))
    }

    /// Execute a GET request and decode the JSON body.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ShopifyError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .map_or(1, parse_retry_after);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Check for unauthorized
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ShopifyError::NotFound(response.url().path().to_string()));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ShopifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Shopify sends `Retry-After` as fractional seconds (e.g. `2.0`).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_retry_after(value: &str) -> u64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(1, |secs| secs.ceil() as u64)
}

impl std::fmt::Debug for ShopifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyClient")
            .field("store", &self.inner.store)
            .field("api_base", &self.inner.api_base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> ShopifyClient {
        ShopifyClient::new(&ShopifyConfig {
            store: "test.myshopify.com".to_string(),
            api_version: "2024-10".to_string(),
            access_token: SecretString::from("shpat_0a1b2c3d4e5f"),
            base_url: Some(server.uri()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_find_customer_by_email() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/api/2024-10/customers/search.json"))
            .and(query_param("query", "email:ada@example.com"))
            .and(header("x-shopify-access-token", "shpat_0a1b2c3d4e5f"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "customers": [
                    {"id": 207_119_551, "email": "Ada@Example.com", "first_name": "Ada", "last_name": "Lovelace"}
                ]
            })))
            .mount(&server)
            .await;

        let email = Email::parse("ada@example.com").unwrap();
        let customer = client(&server)
            .find_customer_by_email(&email)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(customer.id, CustomerId::new(207_119_551));
        assert_eq!(customer.first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_find_customer_ignores_non_matching_result() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/api/2024-10/customers/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "customers": [{"id": 1, "email": "someone-else@example.com"}]
            })))
            .mount(&server)
            .await;

        let email = Email::parse("ada@example.com").unwrap();
        let customer = client(&server).find_customer_by_email(&email).await.unwrap();
        assert!(customer.is_none());
    }

    #[tokio::test]
    async fn test_find_customer_skips_partial_matches() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/api/2024-10/customers/search.json"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "customers": [
                    {"id": 1, "email": "ada@example.com.au"},
                    {"id": 2, "email": "ada@example.com", "first_name": "Ada"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let email = Email::parse("ada@example.com").unwrap();
        let customer = client(&server)
            .find_customer_by_email(&email)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(customer.id, CustomerId::new(2));
        assert_eq!(customer.first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_latest_order_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/api/2024-10/orders.json"))
            .and(query_param("customer_id", "42"))
            .and(query_param("status", "any"))
            .and(query_param("order", "created_at desc"))
            .and(query_param("fields", "id,created_at,line_items"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "orders": [{
                    "id": 9,
                    "created_at": "2024-05-02T09:30:00Z",
                    "line_items": [{"title": "Hat", "sku": "HAT-1"}]
                }]
            })))
            .mount(&server)
            .await;

        let order = client(&server)
            .latest_order(CustomerId::new(42))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(order.summary().title, "Hat");
    }

    #[tokio::test]
    async fn test_latest_order_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin/api/2024-10/orders.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"orders": []})))
            .mount(&server)
            .await;

        let order = client(&server).latest_order(CustomerId::new(42)).await.unwrap();
        assert!(order.is_none());
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2.0"))
            .mount(&server)
            .await;

        let email = Email::parse("ada@example.com").unwrap();
        let result = client(&server).find_customer_by_email(&email).await;
        assert!(matches!(result, Err(ShopifyError::RateLimited(2))));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let result = client(&server).latest_order(CustomerId::new(1)).await;
        assert!(matches!(result, Err(ShopifyError::Api { status: 502, .. })));
    }
}
