//! Paginated segment fetcher.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use segment_enrich_core::{Email, Profile};
use tracing::{debug, error, info, instrument};

use crate::retry::RetryPolicy;
use crate::services::klaviyo::{KlaviyoClient, MAX_PAGE_SIZE};

use super::snapshot::{SnapshotError, write_snapshot};

/// Tuning for the segment fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Profiles requested per page.
    pub page_size: u32,
    /// Pause between consecutive page requests.
    pub page_delay: Duration,
    /// Snapshot file rewritten after every page.
    pub snapshot_path: PathBuf,
}

impl FetchOptions {
    /// Default pause between pages.
    pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

    /// Options with the default page size and delay.
    #[must_use]
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            page_delay: Self::DEFAULT_PAGE_DELAY,
            snapshot_path: snapshot_path.into(),
        }
    }
}

/// Result of a segment fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Deduplicated profiles in first-seen order, capped at the limit.
    pub profiles: Vec<Profile>,
    /// Pages successfully fetched.
    pub pages: usize,
    /// Profiles dropped because their email was already collected.
    pub duplicates: usize,
    /// `true` when a page exhausted its retries and the fetch stopped early.
    pub aborted: bool,
}

/// Fetches every member of one segment.
#[derive(Debug, Clone)]
pub struct SegmentFetcher {
    client: KlaviyoClient,
    segment_id: String,
    options: FetchOptions,
}

impl SegmentFetcher {
    /// Create a fetcher for `segment_id`.
    #[must_use]
    pub fn new(client: KlaviyoClient, segment_id: impl Into<String>, options: FetchOptions) -> Self {
        Self {
            client,
            segment_id: segment_id.into(),
            options,
        }
    }

    /// Fetch all segment members, deduplicated by normalized email.
    ///
    /// Stops when the API reports no further cursor, when `limit` profiles
    /// have been collected, or when a page fails `max_retries` times. The
    /// snapshot is rewritten after every page; a fetch that completes no
    /// page leaves an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error only if the snapshot cannot be written. Upstream
    /// failures end the fetch and are reported through [`FetchReport::aborted`].
    #[instrument(skip(self), fields(segment_id = %self.segment_id))]
    pub async fn fetch_all(
        &self,
        limit: Option<usize>,
        max_retries: u32,
    ) -> Result<FetchReport, SnapshotError> {
        let policy = RetryPolicy::segment_fetch(max_retries);
        let limit = limit.unwrap_or(usize::MAX);
        let mut seen: HashSet<Email> = HashSet::new();
        let mut report = FetchReport::default();
        let mut cursor: Option<String> = None;

        while report.profiles.len() < limit {
            let page_number = report.pages + 1;
            let client = &self.client;
            let segment_id = self.segment_id.as_str();
            let page_cursor = cursor.as_deref();
            let page_size = self.options.page_size;

            let page = match policy
                .run(
                    "segment_page",
                    |attempt| {
                        debug!(page = page_number, attempt, "Requesting segment page");
                        client.segment_profiles_page(segment_id, page_cursor, page_size)
                    },
                    |_| true,
                )
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        page = page_number,
                        attempts = policy.max_attempts,
                        error = %e,
                        "Segment page failed after all retries, stopping fetch"
                    );
                    report.aborted = true;
                    break;
                }
            };
            report.pages = page_number;

            for profile in page.profiles {
                if report.profiles.len() >= limit {
                    break;
                }
                if seen.insert(profile.email.clone()) {
                    report.profiles.push(profile);
                } else {
                    report.duplicates += 1;
                }
            }

            write_snapshot(&self.options.snapshot_path, &report.profiles).await?;
            info!(
                page = page_number,
                received = page.raw_count,
                total = report.profiles.len(),
                duplicates = report.duplicates,
                "Fetched segment page"
            );

            cursor = page.next_cursor;
            if cursor.is_none() || report.profiles.len() >= limit {
                break;
            }
            tokio::time::sleep(self.options.page_delay).await;
        }

        if report.pages == 0 {
            write_snapshot(&self.options.snapshot_path, &report.profiles).await?;
        }

        info!(
            profiles = report.profiles.len(),
            pages = report.pages,
            duplicates = report.duplicates,
            aborted = report.aborted,
            "Segment fetch finished"
        );
        Ok(report)
    }
}
