//! Pipeline run lifecycle, metrics, and result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::job::{JobDetails, JobListing};
use crate::types::processed::ProcessedJob;

/// Lifecycle state of an orchestrator.
///
/// `Paused` is only reachable from `Running`; `Completed`, `Stopped`, and
/// `Failed` are terminal for a run (the next run starts from `Running`
/// again).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
    Failed,
}

impl PipelineStatus {
    /// True once a run has finished, one way or another.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Completed | Self::Failed)
    }

    /// True while a run is in flight (including paused).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Pipeline stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Scraping,
    Processing,
    Storage,
}

/// One entry in the run's ordered error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub stage: PipelineStage,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Counters and error log for one run.
///
/// `jobs_processed + failed_processes <= jobs_scraped` and
/// `jobs_stored + failed_storage <= jobs_processed` always hold; the
/// reverse inequalities do not (stages legitimately fail per item).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    pub jobs_scraped: usize,
    pub jobs_processed: usize,
    pub jobs_stored: usize,
    pub failed_scrapes: usize,
    pub failed_processes: usize,
    pub failed_storage: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub errors: Vec<ErrorLogEntry>,
}

impl PipelineMetrics {
    /// Create fresh metrics with `start_time = now`.
    pub fn new() -> Self {
        Self {
            jobs_scraped: 0,
            jobs_processed: 0,
            jobs_stored: 0,
            failed_scrapes: 0,
            failed_processes: 0,
            failed_storage: 0,
            start_time: Utc::now(),
            end_time: None,
            errors: Vec::new(),
        }
    }

    /// Append to the ordered error log.
    pub fn record_error(&mut self, stage: PipelineStage, message: impl Into<String>) {
        self.errors.push(ErrorLogEntry {
            stage,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// Failures across all stages.
    pub fn total_failures(&self) -> usize {
        self.failed_scrapes + self.failed_processes + self.failed_storage
    }

    /// Wall-clock duration, once the run has ended.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A job that failed at some stage, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    /// The listing the failed job came from
    pub listing: JobListing,

    /// Why it failed
    pub reason: String,
}

impl JobFailure {
    /// Record a failure for a listing.
    pub fn new(listing: JobListing, reason: impl Into<String>) -> Self {
        Self {
            listing,
            reason: reason.into(),
        }
    }
}

/// Per-stage failure lists, each in original listing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailedJobs {
    pub scraping: Vec<JobFailure>,
    pub processing: Vec<JobFailure>,
    pub storage: Vec<JobFailure>,
}

impl FailedJobs {
    /// True if no stage recorded a failure.
    pub fn is_empty(&self) -> bool {
        self.scraping.is_empty() && self.processing.is_empty() && self.storage.is_empty()
    }

    /// Failures across all stages.
    pub fn total(&self) -> usize {
        self.scraping.len() + self.processing.len() + self.storage.len()
    }
}

/// Accumulated job lists for one run, each in original listing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineJobs {
    /// Listings whose detail fetch succeeded
    pub scraped: Vec<JobDetails>,

    /// Jobs the processor completed
    pub processed: Vec<ProcessedJob>,

    /// Jobs the storage layer accepted
    pub stored: Vec<ProcessedJob>,

    /// Per-stage failures
    pub failed: FailedJobs,
}

/// The result of one `run_pipeline` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Unique id for this invocation
    pub run_id: Uuid,

    /// Final lifecycle state (`Completed` or `Stopped` for returned runs)
    pub status: PipelineStatus,

    /// Accumulated job lists
    pub jobs: PipelineJobs,

    /// Final metrics snapshot
    pub metrics: PipelineMetrics,
}

impl PipelineRun {
    /// True when the run finished with no failures at any stage.
    pub fn is_clean(&self) -> bool {
        self.jobs.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(PipelineStatus::Completed.is_terminal());
        assert!(PipelineStatus::Stopped.is_terminal());
        assert!(PipelineStatus::Failed.is_terminal());
        assert!(!PipelineStatus::Paused.is_terminal());
        assert!(PipelineStatus::Paused.is_active());
        assert!(!PipelineStatus::Idle.is_active());
    }

    #[test]
    fn test_error_log_ordering() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_error(PipelineStage::Scraping, "first");
        metrics.record_error(PipelineStage::Storage, "second");

        assert_eq!(metrics.errors.len(), 2);
        assert_eq!(metrics.errors[0].message, "first");
        assert_eq!(metrics.errors[1].stage, PipelineStage::Storage);
    }

    #[test]
    fn test_metrics_duration_requires_end() {
        let mut metrics = PipelineMetrics::new();
        assert!(metrics.duration().is_none());
        metrics.end_time = Some(Utc::now());
        assert!(metrics.duration().is_some());
    }
}
