//! Pipeline orchestrator - sequences scrape → process → store.
//!
//! The orchestrator drives one pipeline run at a time: it fetches the
//! listing sequence, filters it, chunks it into batches, and moves each
//! batch through detail fetch, processing, and storage with a bounded
//! number of batches in flight. Per-item and per-batch failures are folded
//! into the run's failure lists; only run-level failures propagate.
//!
//! Control is cooperative: pause/resume/stop arrive on a command channel
//! and are honored at batch boundaries. In-flight batches always finish;
//! no external call is ever aborted mid-air.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::pipeline::control::{ControlCommand, StatusCell};
use crate::pipeline::retry::RetryPolicy;
use crate::traits::processor::{JobOutcome, Processor};
use crate::traits::spider::Spider;
use crate::traits::storage::Storage;
use crate::types::config::{PipelineConfig, RunOptions};
use crate::types::job::JobListing;
use crate::types::run::{
    FailedJobs, JobFailure, PipelineJobs, PipelineMetrics, PipelineRun, PipelineStage,
    PipelineStatus,
};

/// Pipeline driver and state machine.
///
/// One run may be active per instance; `status()` and `metrics()` are safe
/// to call from other tasks while a run is in flight.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = Orchestrator::new(spider, processor, storage);
/// let run = orchestrator.run_pipeline(RunOptions::new()).await?;
/// println!("stored {} jobs", run.jobs.stored.len());
/// ```
pub struct Orchestrator<S: Spider, P: Processor, St: Storage> {
    spider: Arc<S>,
    processor: Arc<P>,
    storage: Arc<St>,
    config: PipelineConfig,
    status: StatusCell,
    metrics: Arc<RwLock<PipelineMetrics>>,
    control_tx: mpsc::UnboundedSender<ControlCommand>,
    control_rx: Mutex<mpsc::UnboundedReceiver<ControlCommand>>,
}

/// Everything a batch task needs, cloned per spawn.
struct BatchContext<S, P, St> {
    spider: Arc<S>,
    processor: Arc<P>,
    storage: Arc<St>,
    metrics: Arc<RwLock<PipelineMetrics>>,
    retry: RetryPolicy,
    scrape_only: bool,
    continue_on_error: bool,
}

/// Ordered results of one batch, reassembled into the run afterwards.
#[derive(Default)]
struct BatchOutcome {
    scraped: Vec<crate::types::job::JobDetails>,
    processed: Vec<crate::types::processed::ProcessedJob>,
    stored: Vec<crate::types::processed::ProcessedJob>,
    failed: FailedJobs,
}

impl<S, P, St> Orchestrator<S, P, St>
where
    S: Spider + 'static,
    P: Processor + 'static,
    St: Storage + 'static,
{
    /// Create an orchestrator with the default configuration.
    pub fn new(spider: S, processor: P, storage: St) -> Self {
        Self::with_config(spider, processor, storage, PipelineConfig::default())
    }

    /// Create an orchestrator with a custom configuration.
    pub fn with_config(spider: S, processor: P, storage: St, config: PipelineConfig) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Self {
            spider: Arc::new(spider),
            processor: Arc::new(processor),
            storage: Arc::new(storage),
            config,
            status: StatusCell::new(),
            metrics: Arc::new(RwLock::new(PipelineMetrics::new())),
            control_tx,
            control_rx: Mutex::new(control_rx),
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current lifecycle state.
    ///
    /// Reflects pause/stop requests immediately, before the run loop
    /// honors them at the next batch boundary.
    pub fn status(&self) -> PipelineStatus {
        self.status.get()
    }

    /// Snapshot of the current run's metrics (a copy, safe mid-run).
    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.read().unwrap().clone()
    }

    /// Request a pause, effective at the next batch boundary.
    ///
    /// In-flight batches finish; no new batch starts until `resume` or
    /// `stop`. No-op unless a run is active and running.
    pub fn pause(&self) {
        if self.status.get() == PipelineStatus::Running {
            self.status.set(PipelineStatus::Paused);
            let _ = self.control_tx.send(ControlCommand::Pause);
            info!("pipeline pause requested");
        }
    }

    /// Resume a paused run. No-op unless currently paused.
    pub fn resume(&self) {
        if self.status.get() == PipelineStatus::Paused {
            self.status.set(PipelineStatus::Running);
            let _ = self.control_tx.send(ControlCommand::Resume);
            info!("pipeline resume requested");
        }
    }

    /// Request termination, effective at the next batch boundary.
    ///
    /// The run resolves with whatever partial results have accumulated.
    /// Safe to call repeatedly and before the first batch has started;
    /// no-op when no run is active.
    pub fn stop(&self) {
        if self.status.get().is_active() {
            self.status.set(PipelineStatus::Stopped);
            let _ = self.control_tx.send(ControlCommand::Stop);
            info!("pipeline stop requested");
        }
    }

    /// Run the pipeline to completion, stop, or failure.
    pub async fn run_pipeline(&self, options: RunOptions) -> Result<PipelineRun> {
        self.run_pipeline_with_cancel(options, CancellationToken::new())
            .await
    }

    /// Run the pipeline with external cancellation support.
    ///
    /// Cancelling the token is equivalent to calling [`Self::stop`]: the
    /// run winds down at the next batch boundary and resolves with
    /// partial results.
    pub async fn run_pipeline_with_cancel(
        &self,
        options: RunOptions,
        cancel: CancellationToken,
    ) -> Result<PipelineRun> {
        self.config.validate()?;
        let mut control = self
            .control_rx
            .try_lock()
            .map_err(|_| PipelineError::AlreadyRunning)?;

        // Commands raced against the end of a previous run must not leak
        // into this one.
        while control.try_recv().is_ok() {}

        let run_id = Uuid::new_v4();
        self.status.set(PipelineStatus::Running);
        *self.metrics.write().unwrap() = PipelineMetrics::new();
        info!(run_id = %run_id, "pipeline run started");

        let retry = RetryPolicy::new(self.config.retry_attempts, self.config.retry_delay);

        // The listing sequence is the one call with nothing to fall back
        // on: a failure here fails the run.
        let listings = match retry.run("job_listings", || self.spider.job_listings()).await {
            Ok(listings) => listings,
            Err(e) => {
                error!(run_id = %run_id, "failed to fetch job listings: {}", e);
                {
                    let mut m = self.metrics.write().unwrap();
                    m.record_error(PipelineStage::Scraping, e.to_string());
                    m.end_time = Some(Utc::now());
                }
                self.status.set(PipelineStatus::Failed);
                return Err(PipelineError::Scrape(e));
            }
        };
        info!(run_id = %run_id, listings = listings.len(), "fetched job listings");

        let mut selected: Vec<JobListing> = listings
            .into_iter()
            .filter(|l| options.matches_agency(&l.agency))
            .collect();
        if options.max_records > 0 && selected.len() > options.max_records {
            selected.truncate(options.max_records);
        }
        debug!(run_id = %run_id, selected = selected.len(), "listings selected after filters");

        let batches: Vec<Vec<JobListing>> = selected
            .chunks(self.config.batch_size)
            .map(|c| c.to_vec())
            .collect();
        let total_batches = batches.len();
        let mut pending = batches.into_iter().enumerate();
        let mut outcomes: Vec<Option<BatchOutcome>> =
            (0..total_batches).map(|_| None).collect();
        let mut in_flight: JoinSet<(usize, Result<BatchOutcome>)> = JoinSet::new();
        let mut paused = false;
        let mut stopping = false;
        let mut fatal: Option<PipelineError> = None;

        'run: loop {
            // Batch boundary: drain pending control commands first.
            while let Ok(cmd) = control.try_recv() {
                apply_command(cmd, &mut paused, &mut stopping);
            }
            if cancel.is_cancelled() && !stopping {
                stopping = true;
                self.status.set(PipelineStatus::Stopped);
                info!(run_id = %run_id, "cancellation requested, stopping at batch boundary");
            }
            if stopping || fatal.is_some() {
                break 'run;
            }

            if paused {
                tokio::select! {
                    cmd = control.recv() => match cmd {
                        Some(c) => apply_command(c, &mut paused, &mut stopping),
                        None => stopping = true,
                    },
                    Some(joined) = in_flight.join_next() => {
                        record_joined(joined, &mut outcomes, &mut fatal);
                    }
                    _ = cancel.cancelled() => {
                        stopping = true;
                        self.status.set(PipelineStatus::Stopped);
                    }
                    _ = tokio::time::sleep(self.config.poll_interval) => {
                        debug!(run_id = %run_id, "pipeline paused, holding at batch boundary");
                    }
                }
                continue 'run;
            }

            // Launch the next batch when below the concurrency ceiling.
            if in_flight.len() < self.config.max_concurrency {
                if let Some((index, batch)) = pending.next() {
                    debug!(run_id = %run_id, batch = index, jobs = batch.len(), "starting batch");
                    let ctx = BatchContext {
                        spider: Arc::clone(&self.spider),
                        processor: Arc::clone(&self.processor),
                        storage: Arc::clone(&self.storage),
                        metrics: Arc::clone(&self.metrics),
                        retry,
                        scrape_only: options.scrape_only,
                        continue_on_error: options.continue_on_error,
                    };
                    in_flight.spawn(async move {
                        let result = run_batch(index, batch, ctx).await;
                        (index, result)
                    });
                    continue 'run;
                }
            }

            if in_flight.is_empty() {
                break 'run; // every batch launched and finished
            }

            tokio::select! {
                Some(joined) = in_flight.join_next() => {
                    record_joined(joined, &mut outcomes, &mut fatal);
                }
                cmd = control.recv() => match cmd {
                    Some(c) => apply_command(c, &mut paused, &mut stopping),
                    None => stopping = true,
                },
                _ = cancel.cancelled() => {
                    stopping = true;
                    self.status.set(PipelineStatus::Stopped);
                }
            }
        }

        // Stop and failure both let in-flight batches finish.
        while let Some(joined) = in_flight.join_next().await {
            record_joined(joined, &mut outcomes, &mut fatal);
        }

        let metrics = {
            let mut m = self.metrics.write().unwrap();
            m.end_time = Some(Utc::now());
            m.clone()
        };

        if let Some(e) = fatal {
            self.status.set(PipelineStatus::Failed);
            error!(run_id = %run_id, "pipeline run failed: {}", e);
            return Err(e);
        }

        let status = if stopping {
            PipelineStatus::Stopped
        } else {
            PipelineStatus::Completed
        };
        self.status.set(status);

        let mut jobs = PipelineJobs::default();
        for outcome in outcomes.into_iter().flatten() {
            jobs.scraped.extend(outcome.scraped);
            jobs.processed.extend(outcome.processed);
            jobs.stored.extend(outcome.stored);
            jobs.failed.scraping.extend(outcome.failed.scraping);
            jobs.failed.processing.extend(outcome.failed.processing);
            jobs.failed.storage.extend(outcome.failed.storage);
        }

        info!(
            run_id = %run_id,
            status = %status,
            scraped = jobs.scraped.len(),
            processed = jobs.processed.len(),
            stored = jobs.stored.len(),
            failed = jobs.failed.total(),
            "pipeline run finished"
        );

        Ok(PipelineRun {
            run_id,
            status,
            jobs,
            metrics,
        })
    }
}

fn apply_command(cmd: ControlCommand, paused: &mut bool, stopping: &mut bool) {
    match cmd {
        ControlCommand::Pause => *paused = true,
        ControlCommand::Resume => *paused = false,
        ControlCommand::Stop => *stopping = true,
    }
}

fn record_joined(
    joined: std::result::Result<(usize, Result<BatchOutcome>), tokio::task::JoinError>,
    outcomes: &mut [Option<BatchOutcome>],
    fatal: &mut Option<PipelineError>,
) {
    match joined {
        Ok((index, Ok(outcome))) => {
            debug!(batch = index, "batch finished");
            outcomes[index] = Some(outcome);
        }
        Ok((index, Err(e))) => {
            warn!(batch = index, "batch failed: {}", e);
            if fatal.is_none() {
                *fatal = Some(e);
            }
        }
        Err(join_err) => {
            if fatal.is_none() {
                *fatal = Some(PipelineError::Internal(join_err.to_string()));
            }
        }
    }
}

/// Move one batch through detail fetch → process → store.
///
/// Per-item failures are folded into the outcome; an `Err` return is only
/// produced under `continue_on_error = false` and fails the whole run.
async fn run_batch<S, P, St>(
    index: usize,
    listings: Vec<JobListing>,
    ctx: BatchContext<S, P, St>,
) -> Result<BatchOutcome>
where
    S: Spider,
    P: Processor,
    St: Storage,
{
    let mut outcome = BatchOutcome::default();

    // Detail fetch, one listing at a time, preserving listing order.
    for listing in listings {
        match ctx
            .retry
            .run("job_details", || ctx.spider.job_details(&listing))
            .await
        {
            Ok(details) => {
                ctx.metrics.write().unwrap().jobs_scraped += 1;
                outcome.scraped.push(details);
            }
            Err(e) => {
                warn!(job_id = %listing.job_id, "failed to fetch job details: {}", e);
                {
                    let mut m = ctx.metrics.write().unwrap();
                    m.failed_scrapes += 1;
                    m.record_error(
                        PipelineStage::Scraping,
                        format!("{}: {}", listing.job_id, e),
                    );
                }
                if !ctx.continue_on_error {
                    return Err(PipelineError::Scrape(e));
                }
                outcome.failed.scraping.push(JobFailure::new(listing, e.to_string()));
            }
        }
    }

    if ctx.scrape_only || outcome.scraped.is_empty() {
        return Ok(outcome);
    }

    // One processing call per batch; per-job failures come back tagged.
    let job_outcomes = match ctx
        .retry
        .run("process_batch", || ctx.processor.process_batch(&outcome.scraped))
        .await
    {
        Ok(job_outcomes) => job_outcomes,
        Err(e) => {
            warn!(batch = index, "batch processing failed: {}", e);
            {
                let mut m = ctx.metrics.write().unwrap();
                m.failed_processes += outcome.scraped.len();
                m.record_error(PipelineStage::Processing, e.to_string());
            }
            if !ctx.continue_on_error {
                return Err(PipelineError::Process(e));
            }
            for details in &outcome.scraped {
                outcome
                    .failed
                    .processing
                    .push(JobFailure::new(details.listing.clone(), e.to_string()));
            }
            return Ok(outcome);
        }
    };

    // Pair outcomes back to submitted jobs by id; a job with no returned
    // outcome counts as a processing failure.
    let mut by_id: HashMap<String, JobOutcome> = job_outcomes
        .into_iter()
        .map(|o| (o.job_id().to_string(), o))
        .collect();
    for details in &outcome.scraped {
        match by_id.remove(details.job_id()) {
            Some(JobOutcome::Completed(job)) => {
                ctx.metrics.write().unwrap().jobs_processed += 1;
                outcome.processed.push(job);
            }
            Some(JobOutcome::Failed { job_id, reason }) => {
                warn!(job_id = %job_id, "processing failed: {}", reason);
                {
                    let mut m = ctx.metrics.write().unwrap();
                    m.failed_processes += 1;
                    m.record_error(
                        PipelineStage::Processing,
                        format!("{job_id}: {reason}"),
                    );
                }
                if !ctx.continue_on_error {
                    return Err(PipelineError::Process(
                        crate::error::ProcessError::JobFailed { job_id, reason },
                    ));
                }
                outcome
                    .failed
                    .processing
                    .push(JobFailure::new(details.listing.clone(), reason));
            }
            None => {
                let job_id = details.job_id().to_string();
                warn!(job_id = %job_id, "processor returned no outcome for job");
                let reason = "no outcome returned by processor".to_string();
                {
                    let mut m = ctx.metrics.write().unwrap();
                    m.failed_processes += 1;
                    m.record_error(PipelineStage::Processing, format!("{job_id}: {reason}"));
                }
                if !ctx.continue_on_error {
                    return Err(PipelineError::Process(
                        crate::error::ProcessError::JobFailed { job_id, reason },
                    ));
                }
                outcome
                    .failed
                    .processing
                    .push(JobFailure::new(details.listing.clone(), reason));
            }
        }
    }

    if outcome.processed.is_empty() {
        return Ok(outcome);
    }

    // Storage is batch-granular: the store rolls the whole batch back on
    // failure, so every job in it fails together.
    match ctx
        .retry
        .run("store_batch", || ctx.storage.store_batch(&outcome.processed))
        .await
    {
        Ok(()) => {
            ctx.metrics.write().unwrap().jobs_stored += outcome.processed.len();
            outcome.stored = outcome.processed.clone();
        }
        Err(e) => {
            warn!(batch = index, "batch storage failed: {}", e);
            {
                let mut m = ctx.metrics.write().unwrap();
                m.failed_storage += outcome.processed.len();
                m.record_error(PipelineStage::Storage, e.to_string());
            }
            if !ctx.continue_on_error {
                return Err(PipelineError::Storage(e));
            }
            for job in &outcome.processed {
                outcome
                    .failed
                    .storage
                    .push(JobFailure::new(job.details.listing.clone(), e.to_string()));
            }
        }
    }

    Ok(outcome)
}
