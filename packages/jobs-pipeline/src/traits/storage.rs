//! Storage trait - persistence contract for processed jobs.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::processed::ProcessedJob;

/// Contract for the persistence layer.
///
/// Writes are transactional: a failed `store_job` keeps nothing for that
/// job, and a failed `store_batch` keeps nothing from the batch. There is
/// no partial-success signal from a batch write, which is why the
/// orchestrator treats storage failures as batch-granular. Re-storing a
/// job with the same `job_id` upserts.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist one processed job.
    async fn store_job(&self, job: &ProcessedJob) -> StorageResult<()>;

    /// Persist a batch of processed jobs as a unit.
    async fn store_batch(&self, jobs: &[ProcessedJob]) -> StorageResult<()>;

    /// Look up a stored job by its source identifier.
    async fn get_job(&self, job_id: &str) -> StorageResult<Option<ProcessedJob>>;

    /// All stored jobs for one agency.
    async fn jobs_for_agency(&self, agency: &str) -> StorageResult<Vec<ProcessedJob>>;

    /// Number of stored jobs.
    async fn count_jobs(&self) -> StorageResult<usize>;
}
