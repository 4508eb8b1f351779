//! CSV export of enriched records.

use std::path::Path;

use segment_enrich_core::EnrichedRecord;
use tracing::{info, instrument};

use super::ExportError;

/// Column header of the export.
pub const CSV_HEADER: [&str; 7] = [
    "Email",
    "First Name",
    "Last Name",
    "Segment",
    "Product Title",
    "SKU",
    "Order Date",
];

/// Placeholder for order columns of a record without order data.
const NO_ORDER: &str = "None";

/// Write `records` as CSV to `path`, one row per record.
///
/// Missing names are left empty; a record without an order gets `None` in
/// all three order columns.
///
/// # Errors
///
/// Returns an error if a row cannot be encoded or the file cannot be written.
#[instrument(skip(records), fields(records = records.len(), path = %path.display()))]
pub async fn write_csv(
    records: &[EnrichedRecord],
    segment_name: &str,
    path: &Path,
) -> Result<(), ExportError> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for record in records {
        let (title, sku, order_date) = record.most_recent_order.as_ref().map_or(
            (NO_ORDER, NO_ORDER, NO_ORDER),
            |order| (order.title.as_str(), order.sku.as_str(), order.order_date.as_str()),
        );

        writer.write_record([
            record.email.as_str(),
            record.first_name.as_deref().unwrap_or_default(),
            record.last_name.as_deref().unwrap_or_default(),
            segment_name,
            title,
            sku,
            order_date,
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ExportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    info!("CSV export written");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use segment_enrich_core::{Email, OrderSummary, ProfileId};

    use super::*;

    fn record(email: &str, order: Option<OrderSummary>) -> EnrichedRecord {
        EnrichedRecord {
            profile_id: ProfileId::new("P"),
            email: Email::parse(email).unwrap(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            most_recent_order: order,
        }
    }

    #[tokio::test]
    async fn test_write_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enriched.csv");
        let records = [
            record(
                "ada@example.com",
                Some(OrderSummary::from_parts(
                    Some("Tee, Large"),
                    Some("TEE-L"),
                    Some("2024-05-02T09:30:00Z"),
                )),
            ),
            record("bob@example.com", None),
        ];

        write_csv(&records, "VIP Customers", &path).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(
            lines,
            [
                "Email,First Name,Last Name,Segment,Product Title,SKU,Order Date",
                "ada@example.com,Ada,,VIP Customers,\"Tee, Large\",TEE-L,2024-05-02T09:30:00Z",
                "bob@example.com,Ada,,VIP Customers,None,None,None",
            ]
        );
    }

    #[tokio::test]
    async fn test_write_csv_empty_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/enriched.csv");

        write_csv(&[], "Segment", &path).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
