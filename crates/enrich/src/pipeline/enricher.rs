//! Per-record enricher.

use std::path::Path;

use segment_enrich_core::{EnrichedRecord, Profile};
use tracing::{debug, info, instrument, warn};

use crate::retry::RetryPolicy;
use crate::shopify::{ShopifyClient, ShopifyError};

use super::log::{EnrichedLogWriter, LogError, ProcessedEmails};

/// Log a progress line every this many profiles.
const PROGRESS_INTERVAL: usize = 50;

/// What happened to a single profile.
#[derive(Debug)]
pub enum EnrichOutcome {
    /// A record was appended to the log.
    Written(EnrichedRecord),
    /// The email already has a record in the log.
    AlreadyProcessed,
    /// No commerce customer has this email.
    NoCustomer,
    /// The customer has no orders.
    NoOrder,
    /// A lookup failed (including exhausted rate-limit retries).
    Failed(ShopifyError),
}

/// Counters for an enrichment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    /// Profiles examined.
    pub processed: usize,
    /// Records appended to the log.
    pub written: usize,
    /// Profiles skipped because the log already had their email.
    pub already_processed: usize,
    /// Profiles without a matching customer.
    pub no_customer: usize,
    /// Customers without orders.
    pub no_order: usize,
    /// Profiles skipped after a lookup error.
    pub failed: usize,
}

impl EnrichSummary {
    fn record(&mut self, outcome: &EnrichOutcome) {
        self.processed += 1;
        match outcome {
            EnrichOutcome::Written(_) => self.written += 1,
            EnrichOutcome::AlreadyProcessed => self.already_processed += 1,
            EnrichOutcome::NoCustomer => self.no_customer += 1,
            EnrichOutcome::NoOrder => self.no_order += 1,
            EnrichOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Profiles examined but not written.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.processed - self.written
    }
}

/// Resolves each profile's most recent purchase and appends it to the log.
#[derive(Debug)]
pub struct Enricher {
    client: ShopifyClient,
    writer: EnrichedLogWriter,
    processed: ProcessedEmails,
    rate_limit: RetryPolicy,
}

impl Enricher {
    /// Open the enricher on the log at `log_path`.
    ///
    /// The resumability set is loaded once, here, from the existing log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log exists but cannot be read, or cannot be
    /// opened for appending.
    pub async fn open(
        client: ShopifyClient,
        log_path: &Path,
        rate_limit: RetryPolicy,
    ) -> Result<Self, LogError> {
        let processed = ProcessedEmails::load(log_path).await?;
        let writer = EnrichedLogWriter::open(log_path).await?;

        Ok(Self {
            client,
            writer,
            processed,
            rate_limit,
        })
    }

    /// Enrich one profile, appending a record on success.
    ///
    /// Lookup failures never propagate; they become
    /// [`EnrichOutcome::Failed`] so the run continues with the next profile.
    ///
    /// # Errors
    ///
    /// Returns an error only if appending to the log fails.
    #[instrument(skip(self, profile), fields(email = %profile.email))]
    pub async fn enrich(&mut self, profile: &Profile) -> Result<EnrichOutcome, LogError> {
        if self.processed.contains(&profile.email) {
            debug!("Already in enriched log, skipping");
            return Ok(EnrichOutcome::AlreadyProcessed);
        }

        let client = &self.client;
        let email = &profile.email;

        let customer = match self
            .rate_limit
            .run(
                "customer_lookup",
                |_| client.find_customer_by_email(email),
                ShopifyError::is_rate_limited,
            )
            .await
        {
            Ok(Some(customer)) => customer,
            Ok(None) => {
                debug!("No customer found");
                return Ok(EnrichOutcome::NoCustomer);
            }
            Err(e) => {
                warn!(error = %e, "Customer lookup failed, skipping profile");
                return Ok(EnrichOutcome::Failed(e));
            }
        };

        let customer_id = customer.id;
        let order = match self
            .rate_limit
            .run(
                "order_lookup",
                |_| client.latest_order(customer_id),
                ShopifyError::is_rate_limited,
            )
            .await
        {
            Ok(Some(order)) => order,
            Ok(None) => {
                debug!(customer_id = %customer_id, "Customer has no orders");
                return Ok(EnrichOutcome::NoOrder);
            }
            Err(e) => {
                warn!(customer_id = %customer_id, error = %e, "Order lookup failed, skipping profile");
                return Ok(EnrichOutcome::Failed(e));
            }
        };

        let record = EnrichedRecord {
            profile_id: profile.profile_id.clone(),
            email: profile.email.clone(),
            first_name: customer.first_name,
            last_name: customer.last_name,
            most_recent_order: Some(order.summary()),
        };

        self.writer.append(&record).await?;
        self.processed.insert(record.email.clone());
        debug!(order_id = order.id, "Enriched record written");

        Ok(EnrichOutcome::Written(record))
    }

    /// Enrich profiles sequentially, one request in flight at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if appending to the log fails; records written
    /// before the failure stay in the log.
    #[instrument(skip_all, fields(profiles = profiles.len()))]
    pub async fn enrich_all(&mut self, profiles: &[Profile]) -> Result<EnrichSummary, LogError> {
        let mut summary = EnrichSummary::default();
        info!(
            already_processed = self.processed.len(),
            log = %self.writer.path().display(),
            "Starting enrichment"
        );

        for profile in profiles {
            let outcome = self.enrich(profile).await?;
            summary.record(&outcome);

            if summary.processed % PROGRESS_INTERVAL == 0 {
                info!(
                    processed = summary.processed,
                    total = profiles.len(),
                    written = summary.written,
                    "Enrichment progress"
                );
            }
        }

        info!(
            processed = summary.processed,
            written = summary.written,
            already_processed = summary.already_processed,
            no_customer = summary.no_customer,
            no_order = summary.no_order,
            failed = summary.failed,
            "Enrichment finished"
        );
        Ok(summary)
    }
}
