//! Pipeline orchestration - the core of the library.
//!
//! The pipeline sequences:
//! - Listing fetch and filtering
//! - Per-listing detail fetch
//! - Batched processing and storage with a concurrency ceiling
//! - Cooperative pause/resume/stop at batch boundaries
//! - Retry with exponential backoff at every collaborator call

pub mod control;
pub mod orchestrator;
pub mod retry;

pub use control::ControlCommand;
pub use orchestrator::Orchestrator;
pub use retry::RetryPolicy;
