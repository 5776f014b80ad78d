//! Typed errors for the pipeline library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Each collaborator boundary
//! gets its own error family; `PipelineError` is what leaves the
//! orchestrator.

use thiserror::Error;

/// Errors raised by the listing source (spider) boundary.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The listing source is entirely unreachable
    #[error("listing source unavailable: {0}")]
    Unavailable(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Page fetched but could not be parsed into a posting
    #[error("parse error for: {url}")]
    Parse { url: String },

    /// Connection timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Detail page missing for a known listing
    #[error("details not found for job: {job_id}")]
    MissingDetails { job_id: String },
}

/// Errors raised by the analysis/embedding (processor) boundary.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Language-model analysis call failed
    #[error("analysis error: {0}")]
    Analysis(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Model returned something the processor could not use
    #[error("invalid model response: {reason}")]
    InvalidResponse { reason: String },

    /// A single job in a batch failed
    #[error("processing failed for job {job_id}: {reason}")]
    JobFailed { job_id: String, reason: String },
}

/// Errors raised by the persistence (storage) boundary.
///
/// Storage is transactional per job and per batch: an error here means
/// nothing from the failing call was kept.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not reach the database
    #[error("storage connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Write transaction failed and was rolled back
    #[error("transaction rolled back: {reason}")]
    Transaction { reason: String },

    /// Requested job is not stored
    #[error("job not found: {job_id}")]
    NotFound { job_id: String },
}

/// Errors that can leave the orchestrator.
///
/// Per-item and per-batch failures never surface here; they are folded
/// into the run's failure lists. Only run-level failures propagate.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Scraping failure promoted to run level
    #[error("scrape failed: {0}")]
    Scrape(#[from] ScrapeError),

    /// Processing failure promoted to run level
    #[error("processing failed: {0}")]
    Process(#[from] ProcessError),

    /// Storage failure promoted to run level
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    /// A run is already active on this orchestrator instance
    #[error("a pipeline run is already active")]
    AlreadyRunning,

    /// Constructor config failed validation
    #[error("invalid pipeline config: {reason}")]
    InvalidConfig { reason: String },

    /// A batch task died unexpectedly
    #[error("internal pipeline failure: {0}")]
    Internal(String),
}

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for spider operations.
pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for processor operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
