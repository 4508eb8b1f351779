//! Artifact locations inside the output directory.

use std::path::PathBuf;

/// Deduplicated segment profiles (JSON array).
pub const SNAPSHOT_FILE: &str = "profiles.json";
/// Append-only enriched log (NDJSON).
pub const LOG_FILE: &str = "enriched.ndjson";
/// CSV export.
pub const CSV_FILE: &str = "enriched.csv";
/// Purchase pie chart.
pub const CHART_FILE: &str = "purchases.png";

/// Paths of every artifact written under one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn snapshot(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    #[must_use]
    pub fn log(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    #[must_use]
    pub fn csv(&self) -> PathBuf {
        self.dir.join(CSV_FILE)
    }

    #[must_use]
    pub fn chart(&self) -> PathBuf {
        self.dir.join(CHART_FILE)
    }
}
