//! Enriched record, the unit of resumable progress.

use serde::{Deserialize, Serialize};

use super::{Email, OrderSummary, ProfileId};

/// A profile joined with its most recent purchase.
///
/// One record is appended per line to the enriched log. The log holds at
/// most one record per email; the enricher enforces this by consulting the
/// set of emails already present before writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    /// Marketing platform profile ID.
    pub profile_id: ProfileId,
    /// Normalized email address.
    pub email: Email,
    /// Customer first name from the commerce platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Customer last name from the commerce platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Most recent order, `null` when no order data is available.
    #[serde(default)]
    pub most_recent_order: Option<OrderSummary>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_shape() {
        let record = EnrichedRecord {
            profile_id: ProfileId::new("P1"),
            email: Email::parse("a@b.co").unwrap(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            most_recent_order: Some(OrderSummary::from_parts(
                Some("Tee"),
                Some("TEE-1"),
                Some("2024-03-01T10:00:00-05:00"),
            )),
        };

        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(
            line,
            r#"{"profileId":"P1","email":"a@b.co","firstName":"Ada","mostRecentOrder":{"title":"Tee","sku":"TEE-1","orderDate":"2024-03-01T10:00:00-05:00"}}"#
        );
    }

    #[test]
    fn test_missing_order_deserializes_as_none() {
        let record: EnrichedRecord =
            serde_json::from_str(r#"{"profileId":"P1","email":"a@b.co"}"#).unwrap();
        assert!(record.most_recent_order.is_none());

        let record: EnrichedRecord =
            serde_json::from_str(r#"{"profileId":"P1","email":"a@b.co","mostRecentOrder":null}"#)
                .unwrap();
        assert!(record.most_recent_order.is_none());
    }
}
