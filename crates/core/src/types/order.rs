//! Most-recent-order summary.

use serde::{Deserialize, Serialize};

/// Sentinel used when an order exists but a field of its first line item
/// is missing.
pub const NOT_AVAILABLE: &str = "N/A";

/// Summary of a customer's most recent order.
///
/// Derived from the order's first line item. Missing or blank fields hold
/// [`NOT_AVAILABLE`] so every summary can be rendered and aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    /// Product title of the first line item.
    pub title: String,
    /// SKU of the first line item.
    pub sku: String,
    /// Order creation timestamp as reported by the commerce platform.
    pub order_date: String,
}

impl OrderSummary {
    /// Build a summary from the first line item's fields, filling gaps with
    /// [`NOT_AVAILABLE`].
    #[must_use]
    pub fn from_parts(title: Option<&str>, sku: Option<&str>, order_date: Option<&str>) -> Self {
        Self {
            title: or_not_available(title),
            sku: or_not_available(sku),
            order_date: or_not_available(order_date),
        }
    }

    /// Aggregation key used by the purchase chart: `title (SKU: sku)`.
    #[must_use]
    pub fn purchase_key(&self) -> String {
        format!("{} (SKU: {})", self.title, self.sku)
    }
}

fn or_not_available(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_owned(),
        _ => NOT_AVAILABLE.to_owned(),
    }
}
