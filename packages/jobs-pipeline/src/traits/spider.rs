//! Spider trait - the listing source contract.

use async_trait::async_trait;

use crate::error::ScrapeResult;
use crate::types::job::{JobDetails, JobListing};

/// Contract for the job listing source.
///
/// Implementations own their crawl internals (base address, client tag,
/// politeness, their own retries); the orchestrator only consumes the two
/// operations below.
#[async_trait]
pub trait Spider: Send + Sync {
    /// Fetch the full listing sequence from the source.
    ///
    /// Raises only when the source is entirely unavailable; a run cannot
    /// proceed without it.
    async fn job_listings(&self) -> ScrapeResult<Vec<JobListing>>;

    /// Fetch the full posting text for one listing.
    ///
    /// Raises per item; callers decide whether an item failure is fatal.
    async fn job_details(&self, listing: &JobListing) -> ScrapeResult<JobDetails>;

    /// Fetch details for several listings, skipping per-item failures.
    async fn job_details_all(&self, listings: &[JobListing]) -> ScrapeResult<Vec<JobDetails>> {
        let mut details = Vec::with_capacity(listings.len());
        for listing in listings {
            match self.job_details(listing).await {
                Ok(d) => details.push(d),
                Err(e) => {
                    tracing::warn!(job_id = %listing.job_id, "Failed to fetch details: {}", e);
                }
            }
        }
        Ok(details)
    }
}
