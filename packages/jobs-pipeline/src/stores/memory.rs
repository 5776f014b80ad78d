//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StorageResult;
use crate::traits::storage::Storage;
use crate::types::processed::ProcessedJob;

/// In-memory storage for processed jobs.
///
/// Useful for testing and development. Not suitable for production as
/// data is lost on restart. Upserts by `job_id`, matching the contract.
pub struct MemoryStorage {
    jobs: RwLock<HashMap<String, ProcessedJob>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Clear all stored jobs.
    pub fn clear(&self) {
        self.jobs.write().unwrap().clear();
    }

    /// Number of stored jobs, without going through the async trait.
    pub fn job_count(&self) -> usize {
        self.jobs.read().unwrap().len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn store_job(&self, job: &ProcessedJob) -> StorageResult<()> {
        self.jobs
            .write()
            .unwrap()
            .insert(job.job_id().to_string(), job.clone());
        Ok(())
    }

    async fn store_batch(&self, jobs: &[ProcessedJob]) -> StorageResult<()> {
        let mut stored = self.jobs.write().unwrap();
        for job in jobs {
            stored.insert(job.job_id().to_string(), job.clone());
        }
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> StorageResult<Option<ProcessedJob>> {
        Ok(self.jobs.read().unwrap().get(job_id).cloned())
    }

    async fn jobs_for_agency(&self, agency: &str) -> StorageResult<Vec<ProcessedJob>> {
        Ok(self
            .jobs
            .read()
            .unwrap()
            .values()
            .filter(|j| j.agency() == agency)
            .cloned()
            .collect())
    }

    async fn count_jobs(&self) -> StorageResult<usize> {
        Ok(self.jobs.read().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::job::{JobDetails, JobListing};
    use crate::types::processed::{
        EmbeddingKind, EmbeddingRecord, JobEmbeddings, ProcessedJob, TaxonomyAnalysis,
    };

    fn processed(job_id: &str, agency: &str) -> ProcessedJob {
        let listing = JobListing::new(job_id, format!("Role {job_id}"), agency);
        let details = JobDetails::new(listing, "Description.");
        let embeddings = JobEmbeddings {
            job: EmbeddingRecord::new(EmbeddingKind::Job, "Description.", vec![0.5]),
            capabilities: vec![],
            skills: vec![],
        };
        ProcessedJob::new(details, vec![], TaxonomyAnalysis::new("General", "Admin"), embeddings)
    }

    #[tokio::test]
    async fn test_store_and_lookup() {
        let store = MemoryStorage::new();
        store.store_job(&processed("J-1", "Service NSW")).await.unwrap();

        let found = store.get_job("J-1").await.unwrap();
        assert!(found.is_some());
        assert!(store.get_job("J-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_upserts_by_job_id() {
        let store = MemoryStorage::new();
        store.store_job(&processed("J-1", "Service NSW")).await.unwrap();
        store.store_job(&processed("J-1", "Transport for NSW")).await.unwrap();

        assert_eq!(store.job_count(), 1);
        let job = store.get_job("J-1").await.unwrap().unwrap();
        assert_eq!(job.agency(), "Transport for NSW");
    }

    #[tokio::test]
    async fn test_agency_filter_and_count() {
        let store = MemoryStorage::new();
        store
            .store_batch(&[
                processed("J-1", "Service NSW"),
                processed("J-2", "Service NSW"),
                processed("J-3", "NSW Health"),
            ])
            .await
            .unwrap();

        assert_eq!(store.count_jobs().await.unwrap(), 3);
        assert_eq!(store.jobs_for_agency("Service NSW").await.unwrap().len(), 2);
        assert_eq!(store.jobs_for_agency("NSW Health").await.unwrap().len(), 1);
        assert!(store.jobs_for_agency("Unknown").await.unwrap().is_empty());
    }
}
