//! Doodling Trending Worker
//!
//! Background ranking engine for the Doodling content platform.
//!
//! This crate provides:
//! - Signal aggregation over sliding engagement windows
//! - Deterministic dense ranking
//! - Transactional leaderboard materialization per (scope, period)
//! - An interval scheduler with overlap skipping, timeouts and graceful
//!   shutdown
//! - Per-job metrics

pub mod clock;
pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod pipeline;
pub mod scheduler;

pub use config::{JobConfig, WorkerConfig};
pub use error::{JobError, JobResult};
pub use jobs::{JobReport, JobRunner, RankingJob, RunOutcome, RunnerSettings, ScopeTarget};
pub use metrics::{JobMetrics, MetricsSnapshot};
pub use pipeline::RankingPipeline;
pub use scheduler::Scheduler;

use anyhow::{bail, Context, Result};
use doodling_infrastructure::{
    DatabasePool, EngagementRepository, LeaderboardRepository, PgEngagementRepository,
    PgLeaderboardRepository, PgScopeCatalog, ScopeCatalog,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// The trending worker: a scheduler plus its shutdown plumbing
pub struct TrendingWorker {
    config: WorkerConfig,
    scheduler: Arc<Scheduler>,
    database: Option<DatabasePool>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl TrendingWorker {
    /// Create a worker over the given stores
    pub fn new(
        config: WorkerConfig,
        events: Arc<dyn EngagementRepository>,
        leaderboard: Arc<dyn LeaderboardRepository>,
        catalog: Arc<dyn ScopeCatalog>,
    ) -> Self {
        let scheduler = Arc::new(Scheduler::from_config(&config, events, leaderboard, catalog));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Self {
            config,
            scheduler,
            database: None,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Connect to the content database and create a worker over it
    pub async fn connect(config: WorkerConfig) -> Result<Self> {
        let database = DatabasePool::new(&config.database.pool_config())
            .await
            .context("Failed to connect to the content database")?;

        let health = database.health_check().await;
        if !health.healthy {
            database.close().await;
            bail!(
                "content database is unhealthy: {}",
                health.error.unwrap_or_default()
            );
        }
        info!(
            latency_ms = health.latency.as_millis() as u64,
            pool_size = health.pool_size,
            "Connected to the content database"
        );

        let pool = database.pool().clone();

        let mut worker = Self::new(
            config,
            Arc::new(PgEngagementRepository::new(pool.clone())),
            Arc::new(PgLeaderboardRepository::new(pool.clone())),
            Arc::new(PgScopeCatalog::new(pool)),
        );
        worker.database = Some(database);
        Ok(worker)
    }

    /// Run the scheduler until a shutdown signal arrives
    pub async fn start(&mut self) -> Result<()> {
        if !self.config.scheduler.enabled {
            info!("Scheduler is disabled");
            return Ok(());
        }

        info!(
            jobs = self.scheduler.jobs().count(),
            job_timeout_ms = self.config.scheduler.job_timeout.as_millis() as u64,
            "Starting trending worker"
        );
        self.scheduler.start()?;

        // Wait for shutdown signal
        self.shutdown_rx.recv().await;

        info!("Shutting down trending worker");
        self.scheduler
            .shutdown(self.config.scheduler.shutdown_grace)
            .await;

        self.close().await;
        Ok(())
    }

    /// Close the database pool, if the worker owns one
    pub async fn close(&self) {
        if let Some(database) = &self.database {
            database.close().await;
        }
    }

    /// Get a handle to send shutdown signal
    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Pool of a worker created by [`TrendingWorker::connect`]
    pub fn database(&self) -> Option<&DatabasePool> {
        self.database.as_ref()
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }
}
