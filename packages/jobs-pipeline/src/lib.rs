//! Job Postings ETL - Orchestration & Pipeline Control
//!
//! The orchestration core of an ETL pipeline that scrapes government job
//! postings, analyzes them with a language model, embeds them, and loads
//! them into a database. This crate owns the control flow only: the
//! listing source, the analysis stage, and persistence live behind traits
//! and are injected.
//!
//! # Design Philosophy
//!
//! **"Best-effort batch job"**
//!
//! - Per-item and per-batch failures are data, not exceptions
//! - Batches are the unit of failure isolation and of control
//! - Pause/resume/stop are cooperative and boundary-checked
//! - Retry lives at one boundary only, never stacked across layers
//!
//! # Usage
//!
//! ```rust,ignore
//! use jobs_pipeline::{MemoryStorage, Orchestrator, RunOptions};
//! use jobs_pipeline::testing::{MockProcessor, MockSpider};
//!
//! let orchestrator = Orchestrator::new(spider, processor, MemoryStorage::new());
//!
//! // Run everything
//! let run = orchestrator.run_pipeline(RunOptions::new()).await?;
//!
//! // Run a capped, filtered slice
//! let options = RunOptions::new()
//!     .with_agencies(vec!["Transport for NSW".into()])
//!     .with_max_records(50);
//! let run = orchestrator.run_pipeline(options).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator contracts (Spider, Processor, Storage)
//! - [`types`] - Domain data types and run/metrics state
//! - [`pipeline`] - The orchestrator, control channel, and retry policy
//! - [`stores`] - Storage implementations (MemoryStorage)
//! - [`testing`] - Mock collaborators for testing

pub mod error;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{
    PipelineError, ProcessError, ProcessResult, Result, ScrapeError, ScrapeResult, StorageError,
    StorageResult,
};
pub use pipeline::{Orchestrator, RetryPolicy};
pub use stores::MemoryStorage;
pub use traits::{
    processor::{JobOutcome, Processor},
    spider::Spider,
    storage::Storage,
};
pub use types::{
    config::{PipelineConfig, RunOptions},
    job::{JobDetails, JobListing},
    processed::{
        CapabilityAssessment, EmbeddingKind, EmbeddingRecord, JobEmbeddings, ProcessedJob,
        ProcessingStatus, TaxonomyAnalysis, PROCESSING_VERSION,
    },
    run::{
        ErrorLogEntry, FailedJobs, JobFailure, PipelineJobs, PipelineMetrics, PipelineRun,
        PipelineStage, PipelineStatus,
    },
};

// Re-export testing utilities
pub use testing::{FailingStorage, MockProcessor, MockSpider, TestScenario};
