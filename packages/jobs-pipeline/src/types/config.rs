//! Pipeline configuration and per-run options.

use std::env;
use std::time::Duration;

use crate::error::PipelineError;

/// Constructor configuration for the orchestrator.
///
/// `batch_size` and `max_concurrency` must be positive; validation runs at
/// the start of every pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Jobs per batch (unit of failure isolation)
    pub batch_size: usize,

    /// Ceiling on concurrently in-flight batches
    pub max_concurrency: usize,

    /// Attempts per external call (0 and 1 both mean a single try)
    pub retry_attempts: u32,

    /// Base backoff delay; doubles per retry
    pub retry_delay: Duration,

    /// Heartbeat interval while paused
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrency: 2,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl PipelineConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the concurrency ceiling.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the retry attempt count.
    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    /// Set the base retry delay.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Set the paused heartbeat interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Build a config from `ETL_*` environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_usize("ETL_BATCH_SIZE").unwrap_or(defaults.batch_size),
            max_concurrency: env_usize("ETL_MAX_CONCURRENCY").unwrap_or(defaults.max_concurrency),
            retry_attempts: env_usize("ETL_RETRY_ATTEMPTS")
                .map(|v| v as u32)
                .unwrap_or(defaults.retry_attempts),
            retry_delay: env_usize("ETL_RETRY_DELAY_MS")
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(defaults.retry_delay),
            poll_interval: env_usize("ETL_POLL_INTERVAL_MS")
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(defaults.poll_interval),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidConfig {
                reason: "batch_size must be positive".to_string(),
            });
        }
        if self.max_concurrency == 0 {
            return Err(PipelineError::InvalidConfig {
                reason: "max_concurrency must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Per-run options for `run_pipeline`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Hard cap on listings taken after filtering (0 = unlimited)
    pub max_records: usize,

    /// Keep going past per-item failures (true) or fail the run on the
    /// first one (false)
    pub continue_on_error: bool,

    /// Case-sensitive exact-match agency filter
    pub agencies: Option<Vec<String>>,

    /// Skip processing and storage entirely
    pub scrape_only: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_records: 0,
            continue_on_error: true,
            agencies: None,
            scrape_only: false,
        }
    }
}

impl RunOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of listings taken.
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Restrict the run to the given agencies.
    pub fn with_agencies(mut self, agencies: Vec<String>) -> Self {
        self.agencies = Some(agencies);
        self
    }

    /// Fail the run on the first per-item failure.
    pub fn stop_on_error(mut self) -> Self {
        self.continue_on_error = false;
        self
    }

    /// Fetch listings and details only.
    pub fn scrape_only(mut self) -> Self {
        self.scrape_only = true;
        self
    }

    /// Whether a listing's agency passes the filter.
    pub fn matches_agency(&self, agency: &str) -> bool {
        match &self.agencies {
            Some(agencies) => agencies.iter().any(|a| a == agency),
            None => true,
        }
    }
}
