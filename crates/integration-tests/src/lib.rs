//! Integration tests for the segment enrichment pipeline.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p segment-enrich-integration-tests
//! ```
//!
//! Both upstream APIs are replaced by `wiremock` servers, so no credentials
//! or network access are needed. [`TestContext`] starts the servers, builds
//! an [`EnrichConfig`] pointing at them and owns a temporary output
//! directory.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::time::Duration;

use secrecy::SecretString;
use segment_enrich::EnrichConfig;
use segment_enrich::config::{KlaviyoConfig, ShopifyConfig};
use segment_enrich::pipeline::{FetchOptions, OutputLayout};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Segment ID used by every test.
pub const SEGMENT_ID: &str = "SEG123";

/// Shopify Admin API version used by every test.
pub const API_VERSION: &str = "2024-10";

/// Mock upstream APIs plus a scratch output directory.
pub struct TestContext {
    pub klaviyo: MockServer,
    pub shopify: MockServer,
    pub out_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        Self {
            klaviyo: MockServer::start().await,
            shopify: MockServer::start().await,
            out_dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Configuration pointing both clients at the mock servers.
    #[must_use]
    pub fn config(&self) -> EnrichConfig {
        EnrichConfig {
            klaviyo: KlaviyoConfig {
                api_key: SecretString::from("pk_test_4c1b2a"),
                segment_id: SEGMENT_ID.to_string(),
                revision: "2024-10-15".to_string(),
                base_url: self.klaviyo.uri(),
            },
            shopify: ShopifyConfig {
                store: "integration.myshopify.com".to_string(),
                api_version: API_VERSION.to_string(),
                access_token: SecretString::from("shpat_test_9d8c7b"),
                base_url: Some(self.shopify.uri()),
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[must_use]
    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(self.out_dir.path())
    }

    /// Fetch options without the inter-page delay.
    #[must_use]
    pub fn fetch_options(&self, page_size: u32) -> FetchOptions {
        FetchOptions {
            page_size,
            page_delay: Duration::ZERO,
            snapshot_path: self.layout().snapshot(),
        }
    }

    /// Mount segment metadata.
    pub async fn mount_segment(&self, name: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/segments/{SEGMENT_ID}/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"type": "segment", "id": SEGMENT_ID, "attributes": {"name": name}}
            })))
            .mount(&self.klaviyo)
            .await;
    }

    /// Mount segment profile pages. Page `n` is served for cursor `c{n}`
    /// (no cursor for the first page) and links to the next one.
    pub async fn mount_profile_pages(&self, pages: &[&[(&str, &str)]]) {
        for (index, members) in pages.iter().enumerate() {
            let next = (index + 1 < pages.len()).then(|| {
                format!(
                    "{}/segments/{SEGMENT_ID}/profiles/?page%5Bcursor%5D=c{}",
                    self.klaviyo.uri(),
                    index + 1
                )
            });
            let data: Vec<Value> = members
                .iter()
                .map(|(id, email)| {
                    json!({"type": "profile", "id": id, "attributes": {"email": email}})
                })
                .collect();

            let mock = Mock::given(method("GET"))
                .and(path(format!("/segments/{SEGMENT_ID}/profiles/")));
            let mock = if index == 0 {
                mock.and(query_param_is_missing("page[cursor]"))
            } else {
                mock.and(query_param("page[cursor]", format!("c{index}").as_str()))
            };
            mock.respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": data, "links": {"next": next}})),
            )
            .mount(&self.klaviyo)
            .await;
        }
    }

    /// Mount a customer for `email` with one order for `title`/`sku`.
    pub async fn mount_customer_with_order(&self, email: &str, customer_id: u64, title: &str, sku: &str) {
        self.mount_customer(email, customer_id).await;
        Mock::given(method("GET"))
            .and(path(format!("/admin/api/{API_VERSION}/orders.json")))
            .and(query_param("customer_id", customer_id.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "orders": [{
                    "id": customer_id * 10,
                    "name": format!("#{customer_id}"),
                    "created_at": "2024-06-01T12:00:00-04:00",
                    "line_items": [{"title": title, "sku": sku, "quantity": 1}]
                }]
            })))
            .mount(&self.shopify)
            .await;
    }

    /// Mount a customer for `email` without orders.
    pub async fn mount_customer_without_orders(&self, email: &str, customer_id: u64) {
        self.mount_customer(email, customer_id).await;
        Mock::given(method("GET"))
            .and(path(format!("/admin/api/{API_VERSION}/orders.json")))
            .and(query_param("customer_id", customer_id.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orders": []})))
            .mount(&self.shopify)
            .await;
    }

    async fn mount_customer(&self, email: &str, customer_id: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/admin/api/{API_VERSION}/customers/search.json")))
            .and(query_param("query", format!("email:{email}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "customers": [{"id": customer_id, "email": email, "first_name": "Test", "last_name": "Customer"}]
            })))
            .mount(&self.shopify)
            .await;
    }

    /// Any email without a dedicated mock resolves to no customer.
    pub async fn mount_unknown_customers(&self) {
        Mock::given(method("GET"))
            .and(path(format!("/admin/api/{API_VERSION}/customers/search.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"customers": []})))
            .with_priority(10)
            .mount(&self.shopify)
            .await;
    }
}
