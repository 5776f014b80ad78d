//! Pipeline Demo - Reference Entry Point
//!
//! Runs the ETL orchestrator end-to-end against the mock collaborators
//! and prints the run summary. This is the shape of the real entry point:
//! a thin binary that installs a tracing subscriber, builds the
//! collaborators, constructs the orchestrator, and invokes one run.
//!
//! ```bash
//! cargo run --example pipeline_demo
//! ```

use jobs_pipeline::testing::TestScenario;
use jobs_pipeline::{MemoryStorage, Orchestrator, PipelineConfig, RunOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Subscriber installation belongs to the binary, not the library.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let (spider, processor) = TestScenario::new()
        .with_agency_jobs("Transport for NSW", 7)
        .with_agency_jobs("NSW Health", 5)
        .with_agency_jobs("Service NSW", 3)
        .build();
    let processor = processor.with_embedding_dim(256);
    let storage = MemoryStorage::new();

    let config = PipelineConfig::from_env()
        .with_batch_size(4)
        .with_max_concurrency(2);
    let orchestrator = Orchestrator::with_config(spider, processor, storage, config);

    let options = RunOptions::new()
        .with_agencies(vec![
            "Transport for NSW".to_string(),
            "NSW Health".to_string(),
        ])
        .with_max_records(10);
    let run = orchestrator.run_pipeline(options).await?;

    println!();
    println!("run {} finished: {}", run.run_id, run.status);
    println!("  scraped:   {}", run.jobs.scraped.len());
    println!("  processed: {}", run.jobs.processed.len());
    println!("  stored:    {}", run.jobs.stored.len());
    println!(
        "  failed:    {} scraping / {} processing / {} storage",
        run.jobs.failed.scraping.len(),
        run.jobs.failed.processing.len(),
        run.jobs.failed.storage.len()
    );
    if let Some(duration) = run.metrics.duration() {
        println!("  took:      {} ms", duration.num_milliseconds());
    }

    Ok(())
}
