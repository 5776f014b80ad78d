//! Testing utilities including mock collaborators.
//!
//! These are useful for testing applications that drive the pipeline
//! without a real listing source, language model, or database.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ProcessError, ProcessResult, ScrapeError, ScrapeResult, StorageError, StorageResult};
use crate::stores::memory::MemoryStorage;
use crate::traits::processor::{JobOutcome, Processor};
use crate::traits::spider::Spider;
use crate::traits::storage::Storage;
use crate::types::job::{JobDetails, JobListing};
use crate::types::processed::{
    CapabilityAssessment, EmbeddingKind, EmbeddingRecord, JobEmbeddings, ProcessedJob,
    TaxonomyAnalysis,
};

/// A mock spider with predefined listings and details.
///
/// Detail records not stocked explicitly are synthesized from the listing,
/// so most tests only need `with_listing`.
#[derive(Default)]
pub struct MockSpider {
    listings: Arc<RwLock<Vec<JobListing>>>,
    details: Arc<RwLock<HashMap<String, JobDetails>>>,
    fail_details: Arc<RwLock<HashSet<String>>>,
    listings_error: Arc<RwLock<Option<String>>>,
    listing_delay: Duration,
    details_delay: Duration,
    calls: Arc<RwLock<Vec<MockSpiderCall>>>,
}

/// Record of a call made to the mock spider.
#[derive(Debug, Clone)]
pub enum MockSpiderCall {
    Listings,
    Details { job_id: String },
}

impl MockSpider {
    /// Create a new mock spider with no listings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listing (details synthesized on fetch).
    pub fn with_listing(self, listing: JobListing) -> Self {
        self.listings.write().unwrap().push(listing);
        self
    }

    /// Add multiple listings.
    pub fn with_listings(self, listings: impl IntoIterator<Item = JobListing>) -> Self {
        self.listings.write().unwrap().extend(listings);
        self
    }

    /// Stock an explicit detail record for its listing's job id.
    pub fn with_details(self, details: JobDetails) -> Self {
        self.details
            .write()
            .unwrap()
            .insert(details.job_id().to_string(), details);
        self
    }

    /// Make the detail fetch fail for one job id.
    pub fn fail_details_for(self, job_id: impl Into<String>) -> Self {
        self.fail_details.write().unwrap().insert(job_id.into());
        self
    }

    /// Make the listing fetch fail with the given message.
    pub fn fail_listings(self, message: impl Into<String>) -> Self {
        *self.listings_error.write().unwrap() = Some(message.into());
        self
    }

    /// Delay every listing fetch (for control-flow tests).
    pub fn with_listing_delay(mut self, delay: Duration) -> Self {
        self.listing_delay = delay;
        self
    }

    /// Delay every detail fetch (for control-flow tests).
    pub fn with_details_delay(mut self, delay: Duration) -> Self {
        self.details_delay = delay;
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockSpiderCall> {
        self.calls.read().unwrap().clone()
    }

    /// Shared handle to the call log, usable after the spider moves into
    /// an orchestrator.
    pub fn calls_handle(&self) -> Arc<RwLock<Vec<MockSpiderCall>>> {
        Arc::clone(&self.calls)
    }

    /// Number of detail fetches attempted so far.
    pub fn detail_fetch_count(&self) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockSpiderCall::Details { .. }))
            .count()
    }

    fn synthesize_details(listing: &JobListing) -> JobDetails {
        JobDetails::new(
            listing.clone(),
            format!("Position description for {}", listing.title),
        )
        .with_responsibilities(vec![format!("Deliver outcomes as {}", listing.title)])
        .with_requirements(vec!["Relevant experience".to_string()])
        .with_contact(format!("recruitment@{}.example", listing.agency.to_lowercase().replace(' ', "-")))
    }
}

#[async_trait]
impl Spider for MockSpider {
    async fn job_listings(&self) -> ScrapeResult<Vec<JobListing>> {
        self.calls.write().unwrap().push(MockSpiderCall::Listings);

        if !self.listing_delay.is_zero() {
            tokio::time::sleep(self.listing_delay).await;
        }
        if let Some(message) = self.listings_error.read().unwrap().clone() {
            return Err(ScrapeError::Unavailable(message));
        }
        Ok(self.listings.read().unwrap().clone())
    }

    async fn job_details(&self, listing: &JobListing) -> ScrapeResult<JobDetails> {
        self.calls.write().unwrap().push(MockSpiderCall::Details {
            job_id: listing.job_id.clone(),
        });

        if !self.details_delay.is_zero() {
            tokio::time::sleep(self.details_delay).await;
        }
        if self.fail_details.read().unwrap().contains(&listing.job_id) {
            return Err(ScrapeError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock connection refused",
            ))));
        }

        Ok(self
            .details
            .read()
            .unwrap()
            .get(&listing.job_id)
            .cloned()
            .unwrap_or_else(|| Self::synthesize_details(listing)))
    }
}

/// A mock processor producing deterministic analysis and embeddings.
#[derive(Default)]
pub struct MockProcessor {
    /// Jobs that come back as tagged failures
    fail_jobs: Arc<RwLock<HashMap<String, String>>>,

    /// Jobs silently absent from batch results (legacy collaborator shape)
    omit_jobs: Arc<RwLock<HashSet<String>>>,

    /// When set, every batch call fails as a whole
    batch_error: Arc<RwLock<Option<String>>>,

    embedding_dim: usize,
    calls: Arc<RwLock<Vec<MockProcessorCall>>>,
}

/// Record of a call made to the mock processor.
#[derive(Debug, Clone)]
pub enum MockProcessorCall {
    ProcessJob { job_id: String },
    ProcessBatch { job_count: usize },
}

impl MockProcessor {
    /// Create a new mock processor.
    pub fn new() -> Self {
        Self {
            embedding_dim: 1024,
            ..Default::default()
        }
    }

    /// Set the embedding dimension.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Make one job fail with a tagged outcome.
    pub fn fail_job(self, job_id: impl Into<String>, reason: impl Into<String>) -> Self {
        self.fail_jobs
            .write()
            .unwrap()
            .insert(job_id.into(), reason.into());
        self
    }

    /// Drop one job from batch results without a tagged outcome.
    pub fn omit_job(self, job_id: impl Into<String>) -> Self {
        self.omit_jobs.write().unwrap().insert(job_id.into());
        self
    }

    /// Make every batch call fail as a whole.
    pub fn fail_batches(self, message: impl Into<String>) -> Self {
        *self.batch_error.write().unwrap() = Some(message.into());
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockProcessorCall> {
        self.calls.read().unwrap().clone()
    }

    /// Shared handle to the call log, usable after the processor moves
    /// into an orchestrator.
    pub fn calls_handle(&self) -> Arc<RwLock<Vec<MockProcessorCall>>> {
        Arc::clone(&self.calls)
    }

    /// Generate a deterministic embedding based on text.
    fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();

        (0..self.embedding_dim)
            .map(|i| {
                let byte = hash[i % 32] as f32;
                (byte / 127.5) - 1.0
            })
            .collect()
    }

    fn analyze(&self, job: &JobDetails) -> ProcessedJob {
        let capabilities = vec![
            CapabilityAssessment::new("Deliver Results", "Adept", 0.8),
            CapabilityAssessment::new("Communicate Effectively", "Intermediate", 0.6),
        ];
        let taxonomy = TaxonomyAnalysis::new("General", "Corporate Services")
            .with_keywords(
                job.listing
                    .title
                    .split_whitespace()
                    .map(|w| w.to_lowercase())
                    .collect(),
            )
            .with_skills(vec!["stakeholder engagement".to_string()]);

        let embeddings = JobEmbeddings {
            job: EmbeddingRecord::new(
                EmbeddingKind::Job,
                job.full_text(),
                self.deterministic_embedding(&job.full_text()),
            ),
            capabilities: capabilities
                .iter()
                .map(|c| {
                    EmbeddingRecord::new(
                        EmbeddingKind::Capability,
                        c.name.clone(),
                        self.deterministic_embedding(&c.name),
                    )
                })
                .collect(),
            skills: taxonomy
                .skills
                .iter()
                .map(|s| {
                    EmbeddingRecord::new(
                        EmbeddingKind::Skill,
                        s.clone(),
                        self.deterministic_embedding(s),
                    )
                })
                .collect(),
        };

        ProcessedJob::new(job.clone(), capabilities, taxonomy, embeddings)
    }
}

#[async_trait]
impl Processor for MockProcessor {
    async fn process_job(&self, job: &JobDetails) -> ProcessResult<ProcessedJob> {
        self.calls.write().unwrap().push(MockProcessorCall::ProcessJob {
            job_id: job.job_id().to_string(),
        });

        if let Some(reason) = self.fail_jobs.read().unwrap().get(job.job_id()) {
            return Err(ProcessError::JobFailed {
                job_id: job.job_id().to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.analyze(job))
    }

    async fn process_batch(&self, jobs: &[JobDetails]) -> ProcessResult<Vec<JobOutcome>> {
        self.calls
            .write()
            .unwrap()
            .push(MockProcessorCall::ProcessBatch {
                job_count: jobs.len(),
            });

        if let Some(message) = self.batch_error.read().unwrap().clone() {
            return Err(ProcessError::Analysis(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                message,
            ))));
        }

        let fail_jobs = self.fail_jobs.read().unwrap().clone();
        let omit_jobs = self.omit_jobs.read().unwrap().clone();

        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            if omit_jobs.contains(job.job_id()) {
                continue;
            }
            if let Some(reason) = fail_jobs.get(job.job_id()) {
                outcomes.push(JobOutcome::Failed {
                    job_id: job.job_id().to_string(),
                    reason: reason.clone(),
                });
                continue;
            }
            outcomes.push(JobOutcome::Completed(self.analyze(job)));
        }
        Ok(outcomes)
    }
}

/// A storage wrapper that injects batch failures.
///
/// Delegates to the inner store unless failure is injected for the call,
/// mirroring a transaction that rolls back and keeps nothing.
pub struct FailingStorage<St> {
    inner: St,
    fail_all: Arc<RwLock<bool>>,
    fail_calls: Arc<RwLock<HashSet<usize>>>,
    batch_calls: Arc<RwLock<usize>>,
}

impl FailingStorage<MemoryStorage> {
    /// Wrap a fresh in-memory store.
    pub fn new() -> Self {
        Self::wrapping(MemoryStorage::new())
    }
}

impl Default for FailingStorage<MemoryStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl<St: Storage> FailingStorage<St> {
    /// Wrap an existing store.
    pub fn wrapping(inner: St) -> Self {
        Self {
            inner,
            fail_all: Arc::new(RwLock::new(false)),
            fail_calls: Arc::new(RwLock::new(HashSet::new())),
            batch_calls: Arc::new(RwLock::new(0)),
        }
    }

    /// Fail every write.
    pub fn fail_always(self) -> Self {
        *self.fail_all.write().unwrap() = true;
        self
    }

    /// Fail the nth `store_batch` call (0-based).
    pub fn fail_batch_call(self, call: usize) -> Self {
        self.fail_calls.write().unwrap().insert(call);
        self
    }

    /// Number of `store_batch` calls seen so far.
    pub fn batch_call_count(&self) -> usize {
        *self.batch_calls.read().unwrap()
    }

    /// Access the wrapped store.
    pub fn inner(&self) -> &St {
        &self.inner
    }

    fn injected_failure(&self) -> StorageError {
        StorageError::Transaction {
            reason: "injected batch failure".to_string(),
        }
    }
}

#[async_trait]
impl<St: Storage> Storage for FailingStorage<St> {
    async fn store_job(&self, job: &ProcessedJob) -> StorageResult<()> {
        if *self.fail_all.read().unwrap() {
            return Err(self.injected_failure());
        }
        self.inner.store_job(job).await
    }

    async fn store_batch(&self, jobs: &[ProcessedJob]) -> StorageResult<()> {
        let call = {
            let mut calls = self.batch_calls.write().unwrap();
            let call = *calls;
            *calls += 1;
            call
        };
        if *self.fail_all.read().unwrap() || self.fail_calls.read().unwrap().contains(&call) {
            return Err(self.injected_failure());
        }
        self.inner.store_batch(jobs).await
    }

    async fn get_job(&self, job_id: &str) -> StorageResult<Option<ProcessedJob>> {
        self.inner.get_job(job_id).await
    }

    async fn jobs_for_agency(&self, agency: &str) -> StorageResult<Vec<ProcessedJob>> {
        self.inner.jobs_for_agency(agency).await
    }

    async fn count_jobs(&self) -> StorageResult<usize> {
        self.inner.count_jobs().await
    }
}

/// Builder for seeding a spider/processor pair with fixture jobs.
pub struct TestScenario {
    spider: MockSpider,
    processor: MockProcessor,
    next_id: usize,
}

impl TestScenario {
    /// Create a new empty scenario.
    pub fn new() -> Self {
        Self {
            spider: MockSpider::new(),
            processor: MockProcessor::new(),
            next_id: 1,
        }
    }

    /// Add `count` listings for one agency.
    pub fn with_agency_jobs(mut self, agency: &str, count: usize) -> Self {
        for _ in 0..count {
            let id = self.next_id;
            self.next_id += 1;
            self.spider = self.spider.with_listing(
                JobListing::new(format!("J-{id}"), format!("Role {id}"), agency)
                    .with_location("Sydney")
                    .with_url(format!("https://jobs.example/postings/J-{id}")),
            );
        }
        self
    }

    /// Get both mocks.
    pub fn build(self) -> (MockSpider, MockProcessor) {
        (self.spider, self.processor)
    }
}

impl Default for TestScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str) -> JobListing {
        JobListing::new(id, format!("Role {id}"), "Service NSW")
    }

    #[tokio::test]
    async fn test_mock_spider_synthesizes_details() {
        let spider = MockSpider::new().with_listing(listing("J-1"));

        let listings = spider.job_listings().await.unwrap();
        assert_eq!(listings.len(), 1);

        let details = spider.job_details(&listings[0]).await.unwrap();
        assert_eq!(details.job_id(), "J-1");
        assert!(details.description.contains("Role J-1"));
        assert_eq!(spider.detail_fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_spider_failure_injection() {
        let spider = MockSpider::new()
            .with_listing(listing("J-1"))
            .fail_details_for("J-1");

        let listings = spider.job_listings().await.unwrap();
        assert!(spider.job_details(&listings[0]).await.is_err());

        let broken = MockSpider::new().fail_listings("Scraping error");
        let err = broken.job_listings().await.unwrap_err();
        assert!(err.to_string().contains("Scraping error"));
    }

    #[tokio::test]
    async fn test_mock_processor_deterministic_embeddings() {
        let processor = MockProcessor::new().with_embedding_dim(64);
        let spider = MockSpider::new().with_listing(listing("J-1"));
        let listings = spider.job_listings().await.unwrap();
        let details = spider.job_details(&listings[0]).await.unwrap();

        let a = processor.process_job(&details).await.unwrap();
        let b = processor.process_job(&details).await.unwrap();

        assert_eq!(a.embeddings.job.vector.len(), 64);
        assert_eq!(a.embeddings.job.vector, b.embeddings.job.vector);
        assert!(!a.capabilities.is_empty());
    }

    #[tokio::test]
    async fn test_mock_processor_omission_and_failure() {
        let spider = MockSpider::new()
            .with_listing(listing("J-1"))
            .with_listing(listing("J-2"))
            .with_listing(listing("J-3"));
        let listings = spider.job_listings().await.unwrap();
        let mut details = Vec::new();
        for l in &listings {
            details.push(spider.job_details(l).await.unwrap());
        }

        let processor = MockProcessor::new()
            .omit_job("J-1")
            .fail_job("J-2", "model refused");

        let outcomes = processor.process_batch(&details).await.unwrap();
        assert_eq!(outcomes.len(), 2); // J-1 omitted entirely
        assert!(outcomes.iter().any(|o| o.job_id() == "J-2" && !o.is_completed()));
        assert!(outcomes.iter().any(|o| o.job_id() == "J-3" && o.is_completed()));
    }

    #[tokio::test]
    async fn test_failing_storage_nth_call() {
        let processor = MockProcessor::new().with_embedding_dim(8);
        let spider = MockSpider::new().with_listing(listing("J-1"));
        let listings = spider.job_listings().await.unwrap();
        let details = spider.job_details(&listings[0]).await.unwrap();
        let job = processor.process_job(&details).await.unwrap();

        let storage = FailingStorage::new().fail_batch_call(0);
        assert!(storage.store_batch(std::slice::from_ref(&job)).await.is_err());
        assert!(storage.store_batch(std::slice::from_ref(&job)).await.is_ok());
        assert_eq!(storage.batch_call_count(), 2);
        assert_eq!(storage.inner().job_count(), 1);
    }

    #[test]
    fn test_scenario_seeds_listings() {
        let (spider, _processor) = TestScenario::new()
            .with_agency_jobs("Service NSW", 2)
            .with_agency_jobs("NSW Health", 1)
            .build();

        let listings = spider.listings.read().unwrap();
        assert_eq!(listings.len(), 3);
        assert_eq!(listings[2].agency, "NSW Health");
    }
}
