//! Ranking jobs and the runner that guards them

use chrono::{DateTime, Utc};
use doodling_domain::{Period, Scope, ScopeKind, TimeWindow};
use doodling_infrastructure::ScopeCatalog;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::JobConfig;
use crate::error::{JobError, JobResult};
use crate::metrics::JobMetrics;
use crate::pipeline::RankingPipeline;

/// Which scopes a job ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeTarget {
    /// The single global scope
    #[serde(rename = "global")]
    Global,
    /// Every enabled category
    #[serde(rename = "categories")]
    Categories,
    /// Every enabled subcategory
    #[serde(rename = "subcategories")]
    SubCategories,
}

impl ScopeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeTarget::Global => "global",
            ScopeTarget::Categories => "categories",
            ScopeTarget::SubCategories => "subcategories",
        }
    }

    /// Kind of the scopes this target resolves to
    pub fn kind(&self) -> ScopeKind {
        match self {
            ScopeTarget::Global => ScopeKind::Global,
            ScopeTarget::Categories => ScopeKind::Category,
            ScopeTarget::SubCategories => ScopeKind::SubCategory,
        }
    }

    /// Concrete scopes for this target, as the catalog stands now
    pub async fn resolve(&self, catalog: &dyn ScopeCatalog) -> JobResult<Vec<Scope>> {
        let scopes = match self {
            ScopeTarget::Global => vec![Scope::Global],
            ScopeTarget::Categories => catalog
                .category_ids()
                .await?
                .into_iter()
                .map(Scope::Category)
                .collect(),
            ScopeTarget::SubCategories => catalog
                .sub_category_ids()
                .await?
                .into_iter()
                .map(Scope::SubCategory)
                .collect(),
        };
        Ok(scopes)
    }
}

impl fmt::Display for ScopeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(ScopeTarget::Global),
            "categories" => Ok(ScopeTarget::Categories),
            "subcategories" | "sub_categories" => Ok(ScopeTarget::SubCategories),
            other => Err(format!("unknown scope target '{}'", other)),
        }
    }
}

/// One periodic ranking job: a target, a period and a window length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingJob {
    pub name: String,
    pub target: ScopeTarget,
    pub period: Period,
    pub interval: Duration,
    pub window: Duration,
    pub run_on_start: bool,
}

impl RankingJob {
    pub fn new(
        name: impl Into<String>,
        target: ScopeTarget,
        period: Period,
        interval: Duration,
        window: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            period,
            interval,
            window,
            run_on_start: true,
        }
    }

    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    /// The engagement window of a run happening at `now`
    pub fn window_ending_at(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow::ending_at(now, self.window)
    }
}

impl From<&JobConfig> for RankingJob {
    fn from(config: &JobConfig) -> Self {
        RankingJob::new(
            config.name.clone(),
            config.target,
            config.period,
            config.interval,
            config.window,
        )
        .with_run_on_start(config.run_on_start)
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: String,
    pub run_id: Uuid,
    /// Partitions replaced
    pub scopes: usize,
    pub entries_written: u64,
    pub duration: Duration,
}

/// What happened to one trigger of a job
#[derive(Debug)]
pub enum RunOutcome {
    Completed(JobReport),
    /// The previous run was still going; nothing was done
    Skipped,
    Failed(JobError),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RunOutcome::Skipped)
    }

    pub fn error(&self) -> Option<&JobError> {
        match self {
            RunOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Settings shared by every runner
#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    pub job_timeout: Duration,
    pub max_concurrent_scopes: usize,
}

/// Runs one job, never more than one run at a time
pub struct JobRunner {
    job: RankingJob,
    pipeline: Arc<RankingPipeline>,
    catalog: Arc<dyn ScopeCatalog>,
    clock: Arc<dyn Clock>,
    settings: RunnerSettings,
    metrics: JobMetrics,
    running: Mutex<()>,
}

impl JobRunner {
    pub fn new(
        job: RankingJob,
        pipeline: Arc<RankingPipeline>,
        catalog: Arc<dyn ScopeCatalog>,
        clock: Arc<dyn Clock>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            job,
            pipeline,
            catalog,
            clock,
            settings,
            metrics: JobMetrics::new(),
            running: Mutex::new(()),
        }
    }

    pub fn job(&self) -> &RankingJob {
        &self.job
    }

    pub fn metrics(&self) -> &JobMetrics {
        &self.metrics
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Run the job now unless a run is already in progress.
    ///
    /// The run is bounded by the job timeout; a run that hits it is
    /// dropped, which rolls back any open transaction.
    pub async fn trigger(&self, cancel: &CancellationToken) -> RunOutcome {
        let Ok(_running) = self.running.try_lock() else {
            self.metrics.record_skipped();
            warn!(job = %self.job.name, "Previous run still in progress, skipping");
            return RunOutcome::Skipped;
        };

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "ranking_job",
            job = %self.job.name,
            period = %self.job.period,
            run_id = %run_id
        );

        async {
            self.metrics.record_started();
            let started = Instant::now();

            let result =
                match tokio::time::timeout(self.settings.job_timeout, self.execute(run_id, cancel))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(JobError::TimedOut(self.settings.job_timeout)),
                };
            let elapsed = started.elapsed();

            match result {
                Ok(report) => {
                    self.metrics.record_success(elapsed, report.entries_written);
                    info!(
                        scopes = report.scopes,
                        entries_written = report.entries_written,
                        duration_ms = elapsed.as_millis() as u64,
                        "Ranking job completed"
                    );
                    RunOutcome::Completed(report)
                }
                Err(e) => {
                    self.metrics.record_failure(elapsed, &e);
                    match &e {
                        JobError::Cancelled => info!("Ranking job cancelled"),
                        JobError::TimedOut(limit) => warn!(
                            timeout_ms = limit.as_millis() as u64,
                            "Ranking job timed out, leaderboard left as it was"
                        ),
                        _ => error!(
                            error = %e,
                            transient = e.is_transient(),
                            duration_ms = elapsed.as_millis() as u64,
                            "Ranking job failed"
                        ),
                    }
                    RunOutcome::Failed(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, run_id: Uuid, cancel: &CancellationToken) -> JobResult<JobReport> {
        let started = Instant::now();
        let scopes = self.job.target.resolve(self.catalog.as_ref()).await?;
        let window = self.job.window_ending_at(self.clock.now());
        let period = self.job.period;
        let total = scopes.len();

        debug!(scopes = total, window = %window, "Ranking job started");

        // partitions are disjoint, so scopes can be ranked side by side
        let results: Vec<_> = stream::iter(scopes.clone())
            .map(|scope| {
                let pipeline = Arc::clone(&self.pipeline);
                async move { (scope, pipeline.run(scope, period, window, cancel).await) }
            })
            .buffer_unordered(self.settings.max_concurrent_scopes.max(1))
            .collect()
            .await;

        let mut entries_written = 0;
        let mut failures = Vec::new();
        let mut cancelled = false;
        for (scope, result) in results {
            match result {
                Ok(report) => entries_written += report.summary.written,
                Err(JobError::Cancelled) => cancelled = true,
                Err(e) => {
                    error!(scope = %scope, error = %e, "Partition ranking failed");
                    failures.push(e);
                }
            }
        }

        // partitions of disabled categories are emptied, not left frozen
        if self.job.target != ScopeTarget::Global && !cancel.is_cancelled() {
            match self
                .pipeline
                .clear_stale(self.job.target.kind(), period, &scopes)
                .await
            {
                Ok(cleared) if !cleared.is_empty() => {
                    info!(cleared = cleared.len(), "Cleared partitions of disabled scopes");
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Clearing stale partitions failed");
                    failures.push(e);
                }
            }
        }

        if total <= 1 {
            if let Some(e) = failures.pop() {
                return Err(e);
            }
        }
        if !failures.is_empty() {
            return Err(JobError::ScopesFailed {
                failed: failures.len(),
                total,
            });
        }
        if cancelled {
            return Err(JobError::Cancelled);
        }

        Ok(JobReport {
            job: self.job.name.clone(),
            run_id,
            scopes: total,
            entries_written,
            duration: started.elapsed(),
        })
    }
}
