//! Incremental enrichment pipeline.
//!
//! Two resumable stages:
//!
//! 1. [`fetcher`] pages through a segment, deduplicates profiles by
//!    normalized email and rewrites a full [`snapshot`] after every page.
//! 2. [`enricher`] resolves each profile's most recent purchase and appends
//!    one record per profile to the append-only enriched [`log`]. Emails
//!    already in the log are skipped, so an interrupted run can simply be
//!    started again.

pub mod enricher;
pub mod fetcher;
pub mod layout;
pub mod log;
pub mod snapshot;

pub use enricher::{EnrichOutcome, EnrichSummary, Enricher};
pub use fetcher::{FetchOptions, FetchReport, SegmentFetcher};
pub use layout::OutputLayout;
pub use log::{EnrichedLogWriter, LogError, LogStats, ProcessedEmails, read_log};
pub use snapshot::{SnapshotError, load_snapshot, write_snapshot};
