//! Enrichment command.
//!
//! # Environment Variables
//!
//! - `SHOPIFY_STORE` - Shopify store domain
//! - `SHOPIFY_ACCESS_TOKEN` - Admin API access token

use std::path::Path;

use segment_enrich::EnrichConfig;
use segment_enrich::PipelineError;
use segment_enrich::pipeline::{EnrichSummary, Enricher, OutputLayout, load_snapshot};
use segment_enrich::retry::RetryPolicy;
use segment_enrich::shopify::ShopifyClient;
use segment_enrich_core::Profile;

/// Enrich the profiles in `profiles.json`, appending to `enriched.ndjson`.
///
/// Safe to re-run: emails already in the log are skipped.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be loaded, or the log cannot be
/// read or appended.
pub async fn run(config: &EnrichConfig, out_dir: &Path) -> Result<EnrichSummary, PipelineError> {
    let layout = OutputLayout::new(out_dir);
    let profiles = load_snapshot(&layout.snapshot()).await?;
    enrich_profiles(config, out_dir, &profiles).await
}

/// Enrich `profiles`, appending to `enriched.ndjson` under `out_dir`.
///
/// # Errors
///
/// Returns an error if the log cannot be read or appended.
pub async fn enrich_profiles(
    config: &EnrichConfig,
    out_dir: &Path,
    profiles: &[Profile],
) -> Result<EnrichSummary, PipelineError> {
    let layout = OutputLayout::new(out_dir);
    let client = ShopifyClient::new(&config.shopify)?;

    tracing::info!(
        store = %client.store(),
        profiles = profiles.len(),
        log = %layout.log().display(),
        "Enriching profiles"
    );

    let mut enricher = Enricher::open(client, &layout.log(), RetryPolicy::rate_limit()).await?;
    Ok(enricher.enrich_all(profiles).await?)
}
