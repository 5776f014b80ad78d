//! Integration tests for the pipeline orchestrator.
//!
//! These drive full runs against the mock collaborators and check the
//! conservation, filtering, capping, control, and isolation properties of
//! the run loop.

use std::sync::Arc;
use std::time::Duration;

use jobs_pipeline::testing::{FailingStorage, MockProcessor, MockSpider, TestScenario};
use jobs_pipeline::{
    JobListing, MemoryStorage, Orchestrator, PipelineConfig, PipelineError, PipelineStatus,
    RunOptions,
};

fn listing(id: &str, agency: &str) -> JobListing {
    JobListing::new(id, format!("Role {id}"), agency)
        .with_location("Sydney")
        .with_url(format!("https://jobs.example/postings/{id}"))
}

fn fast_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_batch_size(2)
        .with_max_concurrency(1)
        .with_retry_attempts(1)
        .with_retry_delay(Duration::from_millis(1))
        .with_poll_interval(Duration::from_millis(5))
}

#[tokio::test]
async fn happy_path_single_listing() {
    let spider = MockSpider::new().with_listing(listing("J-1", "Service NSW"));
    let processor = MockProcessor::new().with_embedding_dim(16);
    let storage = MemoryStorage::new();
    let orchestrator = Orchestrator::with_config(spider, processor, storage, fast_config());

    let run = orchestrator.run_pipeline(RunOptions::new()).await.unwrap();

    assert_eq!(run.status, PipelineStatus::Completed);
    assert_eq!(run.metrics.jobs_scraped, 1);
    assert_eq!(run.metrics.jobs_processed, 1);
    assert_eq!(run.metrics.jobs_stored, 1);
    assert_eq!(run.metrics.failed_scrapes, 0);
    assert_eq!(run.metrics.failed_processes, 0);
    assert_eq!(run.metrics.failed_storage, 0);
    assert!(run.jobs.failed.is_empty());
    assert!(run.metrics.end_time.is_some());
    assert_eq!(run.jobs.stored[0].job_id(), "J-1");
}

#[tokio::test]
async fn listing_fetch_failure_is_fatal() {
    let spider = MockSpider::new().fail_listings("Scraping error");
    let orchestrator = Orchestrator::with_config(
        spider,
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        fast_config(),
    );

    let err = orchestrator.run_pipeline(RunOptions::new()).await.unwrap_err();

    assert!(err.to_string().contains("Scraping error"));
    assert_eq!(orchestrator.status(), PipelineStatus::Failed);
    let metrics = orchestrator.metrics();
    assert_eq!(metrics.jobs_scraped, 0);
    assert!(!metrics.errors.is_empty());
    assert!(metrics.end_time.is_some());
}

#[tokio::test]
async fn processor_omission_counts_as_failure() {
    // A processor that drops a job from its results without a tagged
    // outcome still produces a recorded processing failure.
    let spider = MockSpider::new().with_listing(listing("J-1", "Service NSW"));
    let processor = MockProcessor::new().with_embedding_dim(16).omit_job("J-1");
    let orchestrator =
        Orchestrator::with_config(spider, processor, MemoryStorage::new(), fast_config());

    let run = orchestrator.run_pipeline(RunOptions::new()).await.unwrap();

    assert_eq!(run.status, PipelineStatus::Completed);
    assert_eq!(run.metrics.jobs_processed, 0);
    assert_eq!(run.metrics.failed_processes, 1);
    assert_eq!(run.jobs.failed.processing.len(), 1);
    assert_eq!(run.jobs.failed.processing[0].listing.job_id, "J-1");
    assert!(run.jobs.stored.is_empty());
}

#[tokio::test]
async fn storage_batch_failure_still_completes() {
    let spider = MockSpider::new().with_listing(listing("J-1", "Service NSW"));
    let storage = FailingStorage::new().fail_always();
    let orchestrator = Orchestrator::with_config(
        spider,
        MockProcessor::new().with_embedding_dim(16),
        storage,
        fast_config(),
    );

    let run = orchestrator.run_pipeline(RunOptions::new()).await.unwrap();

    assert_eq!(run.status, PipelineStatus::Completed);
    assert_eq!(run.metrics.jobs_stored, 0);
    assert_eq!(run.metrics.failed_storage, 1);
    assert_eq!(run.jobs.failed.storage.len(), 1);
    assert_eq!(run.metrics.jobs_processed, 1);
}

#[tokio::test]
async fn conservation_holds_with_mixed_failures() {
    let spider = MockSpider::new()
        .with_listings((1..=5).map(|i| listing(&format!("J-{i}"), "Service NSW")))
        .fail_details_for("J-2");
    let processor = MockProcessor::new()
        .with_embedding_dim(16)
        .fail_job("J-3", "model refused");
    let orchestrator =
        Orchestrator::with_config(spider, processor, MemoryStorage::new(), fast_config());

    let run = orchestrator.run_pipeline(RunOptions::new()).await.unwrap();

    assert_eq!(run.status, PipelineStatus::Completed);
    assert_eq!(
        run.jobs.scraped.len(),
        run.jobs.processed.len() + run.jobs.failed.processing.len()
    );
    assert_eq!(
        run.jobs.processed.len(),
        run.jobs.stored.len() + run.jobs.failed.storage.len()
    );
    assert_eq!(run.jobs.scraped.len(), 4);
    assert_eq!(run.jobs.failed.scraping.len(), 1);
    assert_eq!(run.jobs.stored.len(), 3);

    // Metrics agree with the lists
    assert_eq!(run.metrics.jobs_scraped, run.jobs.scraped.len());
    assert_eq!(run.metrics.failed_scrapes, run.jobs.failed.scraping.len());
    assert_eq!(run.metrics.jobs_processed, run.jobs.processed.len());
    assert_eq!(run.metrics.failed_processes, run.jobs.failed.processing.len());
    assert_eq!(run.metrics.jobs_stored, run.jobs.stored.len());
}

#[tokio::test]
async fn agency_filter_is_exact_match() {
    let spider = MockSpider::new()
        .with_listing(listing("J-1", "Service NSW"))
        .with_listing(listing("J-2", "Service NSW"))
        .with_listing(listing("J-3", "NSW Health"));
    let orchestrator = Orchestrator::with_config(
        spider,
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        fast_config(),
    );

    let options = RunOptions::new().with_agencies(vec!["Service NSW".to_string()]);
    let run = orchestrator.run_pipeline(options).await.unwrap();

    assert_eq!(run.jobs.scraped.len(), 2);
    assert!(run
        .jobs
        .scraped
        .iter()
        .all(|d| d.listing.agency == "Service NSW"));
}

#[tokio::test]
async fn max_records_caps_scraped_listings() {
    let spider = MockSpider::new()
        .with_listings((1..=10).map(|i| listing(&format!("J-{i}"), "Service NSW")));
    let orchestrator = Orchestrator::with_config(
        spider,
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        fast_config(),
    );

    let run = orchestrator
        .run_pipeline(RunOptions::new().with_max_records(3))
        .await
        .unwrap();

    assert_eq!(run.jobs.scraped.len(), 3);
    assert!(run
        .jobs
        .scraped
        .iter()
        .all(|d| ["J-1", "J-2", "J-3"].contains(&d.job_id())));
}

#[tokio::test]
async fn detail_fetch_count_respects_max_records() {
    let spider = MockSpider::new()
        .with_listings((1..=10).map(|i| listing(&format!("J-{i}"), "Service NSW")));
    let calls_handle = spider.calls_handle();
    let orchestrator = Orchestrator::with_config(
        spider,
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        fast_config(),
    );

    orchestrator
        .run_pipeline(RunOptions::new().with_max_records(3))
        .await
        .unwrap();

    let detail_calls = calls_handle
        .read()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, jobs_pipeline::testing::MockSpiderCall::Details { .. }))
        .count();
    assert!(detail_calls <= 3);
}

#[tokio::test]
async fn stop_is_idempotent_and_safe_before_first_batch() {
    let spider = MockSpider::new()
        .with_listings((1..=4).map(|i| listing(&format!("J-{i}"), "Service NSW")))
        .with_listing_delay(Duration::from_millis(50));
    let orchestrator = Arc::new(Orchestrator::with_config(
        spider,
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        fast_config(),
    ));

    let handle = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_pipeline(RunOptions::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Stop lands during the listing fetch, before any batch started.
    orchestrator.stop();
    assert_eq!(orchestrator.status(), PipelineStatus::Stopped); // immediate
    orchestrator.stop(); // idempotent

    let run = handle.await.unwrap().unwrap();
    assert_eq!(run.status, PipelineStatus::Stopped);
    assert_eq!(run.metrics.jobs_scraped, 0);
    assert_eq!(run.metrics.jobs_processed, 0);
    assert_eq!(run.metrics.jobs_stored, 0);
    assert!(run.metrics.end_time.is_some());
    assert!(run.jobs.scraped.is_empty());
    assert!(run.jobs.failed.is_empty());
}

#[tokio::test]
async fn pause_resume_preserves_progress() {
    let fixture = || {
        MockSpider::new()
            .with_listings((1..=6).map(|i| listing(&format!("J-{i}"), "Service NSW")))
            .with_details_delay(Duration::from_millis(5))
    };

    // Uninterrupted baseline.
    let baseline = Orchestrator::with_config(
        fixture(),
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        fast_config(),
    );
    let baseline_run = baseline.run_pipeline(RunOptions::new()).await.unwrap();

    // Paused and resumed mid-run.
    let orchestrator = Arc::new(Orchestrator::with_config(
        fixture(),
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        fast_config(),
    ));
    let handle = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_pipeline(RunOptions::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(12)).await;

    orchestrator.pause();
    assert!(matches!(
        orchestrator.status(),
        PipelineStatus::Paused | PipelineStatus::Completed
    ));
    tokio::time::sleep(Duration::from_millis(40)).await;
    orchestrator.resume();

    let run = handle.await.unwrap().unwrap();
    assert_eq!(run.status, PipelineStatus::Completed);
    assert_eq!(run.jobs.scraped.len(), baseline_run.jobs.scraped.len());
    assert_eq!(run.jobs.processed.len(), baseline_run.jobs.processed.len());
    assert_eq!(run.jobs.stored.len(), baseline_run.jobs.stored.len());

    // Order preserved
    let ids: Vec<_> = run.jobs.stored.iter().map(|j| j.job_id().to_string()).collect();
    let baseline_ids: Vec<_> = baseline_run
        .jobs
        .stored
        .iter()
        .map(|j| j.job_id().to_string())
        .collect();
    assert_eq!(ids, baseline_ids);
}

#[tokio::test]
async fn processing_failure_is_isolated_to_its_batch() {
    let spider = MockSpider::new()
        .with_listings((1..=4).map(|i| listing(&format!("J-{i}"), "Service NSW")));
    let processor = MockProcessor::new().with_embedding_dim(16).omit_job("J-3");
    let orchestrator =
        Orchestrator::with_config(spider, processor, MemoryStorage::new(), fast_config());

    let run = orchestrator.run_pipeline(RunOptions::new()).await.unwrap();

    assert_eq!(run.jobs.failed.processing.len(), 1);
    assert_eq!(run.jobs.failed.processing[0].listing.job_id, "J-3");

    let stored: Vec<_> = run.jobs.stored.iter().map(|j| j.job_id()).collect();
    assert_eq!(stored, vec!["J-1", "J-2", "J-4"]);
}

#[tokio::test]
async fn ordering_preserved_under_concurrency() {
    let spider = MockSpider::new()
        .with_listings((1..=9).map(|i| listing(&format!("J-{i}"), "Service NSW")))
        .with_details_delay(Duration::from_millis(2));
    let config = fast_config().with_batch_size(2).with_max_concurrency(3);
    let orchestrator = Orchestrator::with_config(
        spider,
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        config,
    );

    let run = orchestrator.run_pipeline(RunOptions::new()).await.unwrap();

    let scraped: Vec<_> = run.jobs.scraped.iter().map(|d| d.job_id().to_string()).collect();
    let expected: Vec<_> = (1..=9).map(|i| format!("J-{i}")).collect();
    assert_eq!(scraped, expected);

    let stored: Vec<_> = run.jobs.stored.iter().map(|j| j.job_id().to_string()).collect();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn pause_then_resume_immediately_still_completes() {
    let spider = MockSpider::new()
        .with_listing(listing("J-1", "Service NSW"))
        .with_listing(listing("J-2", "Service NSW"))
        .with_listing_delay(Duration::from_millis(20));
    let orchestrator = Arc::new(Orchestrator::with_config(
        spider,
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        fast_config(),
    ));

    let handle = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_pipeline(RunOptions::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    orchestrator.pause();
    orchestrator.resume();

    let run = handle.await.unwrap().unwrap();
    assert_eq!(run.status, PipelineStatus::Completed);
    assert_eq!(run.metrics.jobs_scraped, 2);
}

#[tokio::test]
async fn scrape_only_skips_processing_and_storage() {
    let (spider, processor) = TestScenario::new()
        .with_agency_jobs("Service NSW", 3)
        .build();
    let processor = processor.with_embedding_dim(16);
    let processor_calls = processor.calls_handle();
    let orchestrator =
        Orchestrator::with_config(spider, processor, MemoryStorage::new(), fast_config());

    let run = orchestrator
        .run_pipeline(RunOptions::new().scrape_only())
        .await
        .unwrap();

    assert_eq!(run.status, PipelineStatus::Completed);
    assert_eq!(run.jobs.scraped.len(), 3);
    assert!(run.jobs.processed.is_empty());
    assert!(run.jobs.stored.is_empty());
    assert!(run.jobs.failed.is_empty());
    assert!(processor_calls.read().unwrap().is_empty());
}

#[tokio::test]
async fn stop_on_error_fails_run_on_first_detail_failure() {
    let spider = MockSpider::new()
        .with_listing(listing("J-1", "Service NSW"))
        .with_listing(listing("J-2", "Service NSW"))
        .fail_details_for("J-1");
    let orchestrator = Orchestrator::with_config(
        spider,
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        fast_config(),
    );

    let result = orchestrator
        .run_pipeline(RunOptions::new().stop_on_error())
        .await;

    assert!(matches!(result, Err(PipelineError::Scrape(_))));
    assert_eq!(orchestrator.status(), PipelineStatus::Failed);
}

#[tokio::test]
async fn whole_batch_processing_failure_fails_every_job_in_batch() {
    let spider = MockSpider::new()
        .with_listings((1..=3).map(|i| listing(&format!("J-{i}"), "Service NSW")));
    let processor = MockProcessor::new()
        .with_embedding_dim(16)
        .fail_batches("model endpoint down");
    let orchestrator =
        Orchestrator::with_config(spider, processor, MemoryStorage::new(), fast_config());

    let run = orchestrator.run_pipeline(RunOptions::new()).await.unwrap();

    assert_eq!(run.status, PipelineStatus::Completed);
    assert_eq!(run.jobs.scraped.len(), 3);
    assert_eq!(run.jobs.failed.processing.len(), 3);
    assert_eq!(run.metrics.failed_processes, 3);
    assert!(run.jobs.stored.is_empty());
}

#[tokio::test]
async fn metrics_snapshot_readable_mid_run() {
    let spider = MockSpider::new()
        .with_listings((1..=4).map(|i| listing(&format!("J-{i}"), "Service NSW")))
        .with_details_delay(Duration::from_millis(10));
    let orchestrator = Arc::new(Orchestrator::with_config(
        spider,
        MockProcessor::new().with_embedding_dim(16),
        MemoryStorage::new(),
        fast_config(),
    ));

    let handle = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_pipeline(RunOptions::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(25)).await;

    let snapshot = orchestrator.metrics();
    assert!(snapshot.end_time.is_none()); // still running
    assert!(snapshot.jobs_scraped <= 4);

    let run = handle.await.unwrap().unwrap();
    assert_eq!(run.metrics.jobs_scraped, 4);
}

mod conservation {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// The scraped/processed/stored counts always reconcile.
        #[test]
        fn holds_for_random_failure_patterns(
            jobs in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..12),
            batch_size in 1usize..5,
            storage_fails in any::<bool>(),
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let mut spider = MockSpider::new();
                let mut processor = MockProcessor::new().with_embedding_dim(8);
                for (i, (fail_scrape, fail_process)) in jobs.iter().enumerate() {
                    let id = format!("J-{i}");
                    spider = spider.with_listing(listing(&id, "Service NSW"));
                    if *fail_scrape {
                        spider = spider.fail_details_for(id.as_str());
                    } else if *fail_process {
                        processor = processor.fail_job(id.as_str(), "synthetic failure");
                    }
                }
                let mut storage = FailingStorage::new();
                if storage_fails {
                    storage = storage.fail_always();
                }

                let config = fast_config().with_batch_size(batch_size);
                let orchestrator = Orchestrator::with_config(spider, processor, storage, config);
                let run = orchestrator.run_pipeline(RunOptions::new()).await.unwrap();

                assert_eq!(run.status, PipelineStatus::Completed);
                assert_eq!(
                    run.jobs.scraped.len(),
                    run.jobs.processed.len() + run.jobs.failed.processing.len()
                );
                assert_eq!(
                    run.jobs.processed.len(),
                    run.jobs.stored.len() + run.jobs.failed.storage.len()
                );
                assert!(
                    run.metrics.jobs_processed + run.metrics.failed_processes
                        <= run.metrics.jobs_scraped + run.metrics.failed_scrapes
                );
            });
        }
    }
}
