//! Shopify Admin REST API client (read-only customer and order lookups).
//!
//! # Architecture
//!
//! - Plain REST calls with `reqwest`, authenticated via `X-Shopify-Access-Token`
//! - Direct API calls to Shopify (no local database sync)
//! - Rate limiting surfaces as [`ShopifyError::RateLimited`]; callers decide
//!   whether to retry (see [`crate::retry::RetryPolicy::rate_limit`])
//!
//! # Example
//!
//! ```rust,ignore
//! use segment_enrich::shopify::ShopifyClient;
//!
//! let client = ShopifyClient::new(&config.shopify)?;
//!
//! if let Some(customer) = client.find_customer_by_email(&email).await? {
//!     let order = client.latest_order(customer.id).await?;
//! }
//! ```

mod client;
pub mod types;

pub use client::ShopifyClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid request URL or header.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl ShopifyError {
    /// Whether this error is a 429 throttle response.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shopify_error_display() {
        let err = ShopifyError::NotFound("customer-123".to_string());
        assert_eq!(err.to_string(), "Not found: customer-123");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ShopifyError::RateLimited(2);
        assert_eq!(err.to_string(), "Rate limited, retry after 2 seconds");
        assert!(err.is_rate_limited());
        assert!(!ShopifyError::Unauthorized("x".to_string()).is_rate_limited());
    }
}
