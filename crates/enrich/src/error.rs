//! Unified error handling for the pipeline.

use thiserror::Error;

use crate::config::ConfigError;
use crate::export::ExportError;
use crate::pipeline::{LogError, SnapshotError};
use crate::services::klaviyo::KlaviyoError;
use crate::shopify::ShopifyError;

/// Top-level error for a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Klaviyo API operation failed.
    #[error("Klaviyo error: {0}")]
    Klaviyo(#[from] KlaviyoError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Profile snapshot could not be read or written.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Enriched log could not be read or appended.
    #[error(transparent)]
    Log(#[from] LogError),

    /// CSV or chart export failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Segment fetch gave up after exhausting its retries.
    #[error("Segment fetch aborted after {pages} page(s)")]
    FetchAborted { pages: usize },
}
