//! Processor trait - capability/taxonomy analysis and embedding generation.

use async_trait::async_trait;

use crate::error::ProcessResult;
use crate::types::job::JobDetails;
use crate::types::processed::ProcessedJob;

/// Tagged outcome for one job submitted in a batch.
///
/// The batch entry point reports every submitted job explicitly instead of
/// silently dropping failed ones, so callers never have to diff input
/// against output by position to learn what failed.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// Fully analyzed and embedded
    Completed(ProcessedJob),

    /// Processing failed for this job
    Failed { job_id: String, reason: String },
}

impl JobOutcome {
    /// The job this outcome belongs to.
    pub fn job_id(&self) -> &str {
        match self {
            Self::Completed(job) => job.job_id(),
            Self::Failed { job_id, .. } => job_id,
        }
    }

    /// True for a completed outcome.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Unwrap into the processed record, if completed.
    pub fn into_processed(self) -> Option<ProcessedJob> {
        match self {
            Self::Completed(job) => Some(job),
            Self::Failed { .. } => None,
        }
    }
}

/// Contract for the analysis stage.
///
/// Implementations wrap the language-model and embedding calls; internal
/// prompt batching and rate limiting are their own concern.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Analyze and embed a single job.
    async fn process_job(&self, job: &JobDetails) -> ProcessResult<ProcessedJob>;

    /// Analyze and embed a batch of jobs.
    ///
    /// Returns one outcome per submitted job. Raises only when the batch
    /// call itself fails as a whole (e.g. the model endpoint is down);
    /// per-job failures come back as `JobOutcome::Failed` entries.
    async fn process_batch(&self, jobs: &[JobDetails]) -> ProcessResult<Vec<JobOutcome>> {
        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            match self.process_job(job).await {
                Ok(processed) => outcomes.push(JobOutcome::Completed(processed)),
                Err(e) => outcomes.push(JobOutcome::Failed {
                    job_id: job.job_id().to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        Ok(outcomes)
    }
}
