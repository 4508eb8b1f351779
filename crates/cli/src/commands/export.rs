//! Export command (CSV + purchase chart).

use std::path::Path;

use segment_enrich::EnrichConfig;
use segment_enrich::PipelineError;
use segment_enrich::export::{
    ChartSummary, PurchaseCounts, TOP_PURCHASES, render_pie_chart, write_csv,
};
use segment_enrich::pipeline::{OutputLayout, load_snapshot, read_log};
use segment_enrich::services::klaviyo::KlaviyoClient;

/// Segment display name, falling back to the segment ID.
async fn segment_name(config: &EnrichConfig) -> String {
    let segment_id = &config.klaviyo.segment_id;
    let lookup = match KlaviyoClient::new(&config.klaviyo) {
        Ok(client) => client.get_segment(segment_id).await,
        Err(e) => Err(e),
    };

    match lookup {
        Ok(segment) => segment.attributes.name,
        Err(e) => {
            tracing::warn!(error = %e, "Could not load segment name, using segment ID");
            segment_id.clone()
        }
    }
}

/// Write `enriched.csv` and `purchases.png` from the enriched log.
///
/// `total_profiles` is the segment size shown on the chart; when `None` it
/// is read from the snapshot, falling back to the number of records.
///
/// # Errors
///
/// Returns an error if the log cannot be read or an artifact cannot be
/// written.
pub async fn run(
    config: &EnrichConfig,
    out_dir: &Path,
    total_profiles: Option<usize>,
) -> Result<(), PipelineError> {
    let layout = OutputLayout::new(out_dir);
    let records = read_log(&layout.log()).await?;
    let segment_name = segment_name(config).await;

    write_csv(&records, &segment_name, &layout.csv()).await?;

    let total_profiles = match total_profiles {
        Some(total) => total,
        None => match load_snapshot(&layout.snapshot()).await {
            Ok(profiles) => profiles.len(),
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot unavailable, counting enriched records instead");
                records.len()
            }
        },
    };

    let counts = PurchaseCounts::from_log(&layout.log()).await?;
    render_pie_chart(
        &ChartSummary::new(segment_name, total_profiles),
        &counts,
        TOP_PURCHASES,
        &layout.chart(),
    )?;

    tracing::info!(
        records = records.len(),
        products = counts.len(),
        csv = %layout.csv().display(),
        chart = %layout.chart().display(),
        "Export finished"
    );
    Ok(())
}
