//! Shopify Admin REST API types.
//!
//! Only the fields read by the enrichment pipeline are modeled; Shopify
//! returns many more.

use segment_enrich_core::{CustomerId, OrderSummary};
use serde::Deserialize;

/// Response of `customers/search.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerSearchResponse {
    #[serde(default)]
    pub customers: Vec<Customer>,
}

/// A commerce customer resolved from a profile email.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Response of `orders.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderListResponse {
    #[serde(default)]
    pub orders: Vec<Order>,
}

/// An order, reduced to what the summary needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// An order line item.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
}

impl Order {
    /// Summarize the order by its first line item.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        let first = self.line_items.first();
        OrderSummary::from_parts(
            first.and_then(|item| item.title.as_deref()),
            first.and_then(|item| item.sku.as_deref()),
            self.created_at.as_deref(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use segment_enrich_core::NOT_AVAILABLE;

    use super::*;

    #[test]
    fn test_order_summary_uses_first_line_item() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 450_789_469,
            "created_at": "2024-03-01T10:00:00-05:00",
            "line_items": [
                {"title": "Pineapple Tee", "sku": "TEE-PNP", "quantity": 1},
                {"title": "Sticker", "sku": "STK-1", "quantity": 3}
            ]
        }))
        .unwrap();

        let summary = order.summary();
        assert_eq!(summary.title, "Pineapple Tee");
        assert_eq!(summary.sku, "TEE-PNP");
        assert_eq!(summary.order_date, "2024-03-01T10:00:00-05:00");
    }

    #[test]
    fn test_order_summary_without_line_items() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 1,
            "created_at": "2024-03-01T10:00:00Z",
            "line_items": []
        }))
        .unwrap();

        let summary = order.summary();
        assert_eq!(summary.title, NOT_AVAILABLE);
        assert_eq!(summary.sku, NOT_AVAILABLE);
    }

    #[test]
    fn test_line_item_null_sku() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 1,
            "created_at": "2024-03-01T10:00:00Z",
            "line_items": [{"title": "Gift Card", "sku": null}]
        }))
        .unwrap();

        assert_eq!(order.summary().sku, NOT_AVAILABLE);
    }
}
