//! Processed job records produced by the analysis stage.
//!
//! A `ProcessedJob` is the detail record plus everything the processor
//! derives from it: capability assessments, taxonomy placement, and the
//! embedding vectors for downstream semantic search. Records are never
//! mutated after creation; a re-run produces a new record for the same
//! `job_id` and upsert semantics live in storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::job::JobDetails;

/// Schema version stamped on every processed record.
pub const PROCESSING_VERSION: u32 = 1;

/// Outcome of processing a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Completed,
    Failed,
}

/// One capability assessment from the capability analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityAssessment {
    /// Capability name (e.g. "Deliver Results")
    pub name: String,

    /// Required level (e.g. "Adept", "Advanced")
    pub level: String,

    /// Relevance to the role (0.0 to 1.0)
    pub relevance: f32,
}

impl CapabilityAssessment {
    /// Create a new assessment.
    pub fn new(name: impl Into<String>, level: impl Into<String>, relevance: f32) -> Self {
        Self {
            name: name.into(),
            level: level.into(),
            relevance,
        }
    }
}

/// Taxonomy placement for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyAnalysis {
    /// Broad job family (e.g. "Policy")
    pub job_family: String,

    /// Function within the family (e.g. "Policy Development")
    pub job_function: String,

    /// Keywords extracted from the posting
    pub keywords: Vec<String>,

    /// Named skills extracted from the posting
    pub skills: Vec<String>,
}

impl TaxonomyAnalysis {
    /// Create a new taxonomy analysis.
    pub fn new(job_family: impl Into<String>, job_function: impl Into<String>) -> Self {
        Self {
            job_family: job_family.into(),
            job_function: job_function.into(),
            keywords: Vec::new(),
            skills: Vec::new(),
        }
    }

    /// Set the keyword list.
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Set the skill list.
    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = skills;
        self
    }
}

/// What a vector was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKind {
    Job,
    Capability,
    Skill,
}

/// One embedding vector with its generation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// The vector itself
    pub vector: Vec<f32>,

    /// Text the vector was generated from
    pub source: String,

    /// What kind of text was embedded
    pub kind: EmbeddingKind,

    /// When the vector was generated
    pub created_at: DateTime<Utc>,
}

impl EmbeddingRecord {
    /// Create a new embedding record.
    pub fn new(kind: EmbeddingKind, source: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            vector,
            source: source.into(),
            kind,
            created_at: Utc::now(),
        }
    }

    /// Vector dimension.
    pub fn dim(&self) -> usize {
        self.vector.len()
    }
}

/// The full set of vectors generated for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEmbeddings {
    /// Whole-posting vector
    pub job: EmbeddingRecord,

    /// One vector per assessed capability
    pub capabilities: Vec<EmbeddingRecord>,

    /// One vector per extracted skill
    pub skills: Vec<EmbeddingRecord>,
}

/// A fully processed job, ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedJob {
    /// The detail record this was derived from
    pub details: JobDetails,

    /// Capability analysis result
    pub capabilities: Vec<CapabilityAssessment>,

    /// Taxonomy analysis result
    pub taxonomy: TaxonomyAnalysis,

    /// Embedding vectors with metadata
    pub embeddings: JobEmbeddings,

    /// When processing finished
    pub processed_at: DateTime<Utc>,

    /// Processing schema version
    pub version: u32,

    /// Outcome of processing
    pub status: ProcessingStatus,
}

impl ProcessedJob {
    /// Create a completed record.
    pub fn new(
        details: JobDetails,
        capabilities: Vec<CapabilityAssessment>,
        taxonomy: TaxonomyAnalysis,
        embeddings: JobEmbeddings,
    ) -> Self {
        Self {
            details,
            capabilities,
            taxonomy,
            embeddings,
            processed_at: Utc::now(),
            version: PROCESSING_VERSION,
            status: ProcessingStatus::Completed,
        }
    }

    /// The stable source identifier for this job.
    pub fn job_id(&self) -> &str {
        self.details.job_id()
    }

    /// The hiring agency.
    pub fn agency(&self) -> &str {
        &self.details.listing.agency
    }
}
