//! Segment fetch command.
//!
//! # Environment Variables
//!
//! - `KLAVIYO_API_KEY` - Klaviyo private API key
//! - `KLAVIYO_SEGMENT_ID` - Segment to fetch

use std::path::Path;

use segment_enrich::EnrichConfig;
use segment_enrich::PipelineError;
use segment_enrich::pipeline::{FetchOptions, FetchReport, OutputLayout, SegmentFetcher};
use segment_enrich::services::klaviyo::KlaviyoClient;

/// Fetch the configured segment into `profiles.json` under `out_dir`.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the snapshot cannot be
/// written. An exhausted page retry is reported through
/// [`FetchReport::aborted`], not as an error.
pub async fn run(
    config: &EnrichConfig,
    out_dir: &Path,
    limit: Option<usize>,
    max_retries: u32,
) -> Result<FetchReport, PipelineError> {
    let layout = OutputLayout::new(out_dir);
    let client = KlaviyoClient::new(&config.klaviyo)?;

    tracing::info!(
        segment_id = %config.klaviyo.segment_id,
        limit = ?limit,
        max_retries,
        snapshot = %layout.snapshot().display(),
        "Fetching segment profiles"
    );

    let fetcher = SegmentFetcher::new(
        client,
        config.klaviyo.segment_id.clone(),
        FetchOptions::new(layout.snapshot()),
    );
    Ok(fetcher.fetch_all(limit, max_retries).await?)
}
