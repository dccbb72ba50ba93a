//! Interval scheduler for ranking jobs
//!
//! Every job gets its own timer task. A tick hands the run to the job's
//! [`JobRunner`], whose guard drops the tick when the previous run of the
//! same job is still going. Jobs never wait on each other.

use doodling_infrastructure::{EngagementRepository, LeaderboardRepository, ScopeCatalog};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::WorkerConfig;
use crate::error::{JobError, JobResult};
use crate::jobs::{JobRunner, RankingJob, RunOutcome, RunnerSettings};
use crate::metrics::MetricsSnapshot;
use crate::pipeline::RankingPipeline;

/// Process-scoped scheduler with an explicit start / shutdown lifecycle
pub struct Scheduler {
    runners: Vec<Arc<JobRunner>>,
    cancel: CancellationToken,
    started: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler for `jobs`, all sharing one pipeline
    pub fn new(
        jobs: Vec<RankingJob>,
        pipeline: Arc<RankingPipeline>,
        catalog: Arc<dyn ScopeCatalog>,
        clock: Arc<dyn Clock>,
        settings: RunnerSettings,
    ) -> Self {
        let runners = jobs
            .into_iter()
            .map(|job| {
                Arc::new(JobRunner::new(
                    job,
                    Arc::clone(&pipeline),
                    Arc::clone(&catalog),
                    Arc::clone(&clock),
                    settings,
                ))
            })
            .collect();

        Self {
            runners,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Create a scheduler for the enabled jobs of a configuration
    pub fn from_config(
        config: &WorkerConfig,
        events: Arc<dyn EngagementRepository>,
        leaderboard: Arc<dyn LeaderboardRepository>,
        catalog: Arc<dyn ScopeCatalog>,
    ) -> Self {
        let pipeline = Arc::new(RankingPipeline::new(events, leaderboard, &config.ranking));
        let jobs = config.enabled_jobs().map(RankingJob::from).collect();

        Self::new(
            jobs,
            pipeline,
            catalog,
            Arc::new(SystemClock),
            RunnerSettings {
                job_timeout: config.scheduler.job_timeout,
                max_concurrent_scopes: config.scheduler.max_concurrent_scopes,
            },
        )
    }

    /// Spawn one timer task per job
    pub fn start(&self) -> JobResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(JobError::AlreadyStarted);
        }

        info!(num_jobs = self.runners.len(), "Starting scheduler");

        let mut handles = self.handles.lock();
        for runner in &self.runners {
            let runner = Arc::clone(runner);
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(run_timer(runner, cancel)));
        }
        Ok(())
    }

    /// Run a job now, outside its timer, through the same overlap guard
    pub async fn trigger(&self, name: &str) -> JobResult<RunOutcome> {
        let runner = self
            .runner(name)
            .ok_or_else(|| JobError::UnknownJob(name.to_string()))?;
        Ok(runner.trigger(&self.cancel).await)
    }

    /// Stop all timers and wait up to `grace` for in-flight runs.
    ///
    /// Runs still going after `grace` are aborted. Returns whether every
    /// task finished on its own.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        info!(grace_ms = grace.as_millis() as u64, "Shutting down scheduler");
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        let aborts: Vec<AbortHandle> = handles.iter().map(|h| h.abort_handle()).collect();

        match tokio::time::timeout(grace, futures::future::join_all(handles)).await {
            Ok(_) => {
                info!("Scheduler stopped");
                true
            }
            Err(_) => {
                warn!("Grace period elapsed, aborting in-flight runs");
                for abort in aborts {
                    abort.abort();
                }
                false
            }
        }
    }

    /// Token cancelled on shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn runner(&self, name: &str) -> Option<&Arc<JobRunner>> {
        self.runners.iter().find(|r| r.job().name == name)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &RankingJob> {
        self.runners.iter().map(|r| r.job())
    }

    /// Metrics of every job, in job table order
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.runners
            .iter()
            .map(|r| (r.job().name.clone(), r.metrics().snapshot()))
            .collect()
    }
}

/// Timer loop of one job.
///
/// Each tick spawns the run so the timer keeps ticking while it is in
/// flight; a tick that lands during a run is dropped by the runner guard.
async fn run_timer(runner: Arc<JobRunner>, cancel: CancellationToken) {
    let job = runner.job();
    let first_tick = if job.run_on_start {
        Instant::now()
    } else {
        Instant::now() + job.interval
    };
    let mut ticker = tokio::time::interval_at(first_tick, job.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(
        job = %job.name,
        interval = %doodling_common::format_duration(job.interval),
        window = %doodling_common::format_duration(job.window),
        "Job timer started"
    );

    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            _ = ticker.tick() => {
                let runner = Arc::clone(&runner);
                let cancel = cancel.clone();
                in_flight.spawn(async move {
                    runner.trigger(&cancel).await;
                });
            }
        }
    }

    // let the current run observe cancellation and finish
    while in_flight.join_next().await.is_some() {}
    debug!(job = %runner.job().name, "Job timer stopped");
}
