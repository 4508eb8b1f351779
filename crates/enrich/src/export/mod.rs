//! Exporters reading the enriched log.
//!
//! - [`csv`]: flat 7-column CSV
//! - [`chart`]: top-purchases pie chart (PNG)

pub mod chart;
pub mod csv;

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::LogError;

pub use chart::{ChartSummary, PurchaseCounts, TOP_PURCHASES, render_pie_chart};
pub use csv::{CSV_HEADER, write_csv};

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Reading the enriched log failed.
    #[error(transparent)]
    Log(#[from] LogError),

    /// Encoding a CSV row failed.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    /// Writing an output file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Chart rendering failed.
    #[error("Chart rendering failed: {0}")]
    Chart(String),
}
