//! Worker configuration

use anyhow::{bail, Context, Result};
use doodling_common::serialization::{
    deserialize_duration_from_seconds, serialize_duration_as_seconds,
};
use doodling_common::{load_layered, ConfigSources, TelemetryConfig};
use doodling_domain::{Period, TieBreak};
use doodling_infrastructure::DatabaseConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::jobs::ScopeTarget;

/// Prefix for environment overrides, e.g. `TRENDING__SCHEDULER__ENABLED=false`
pub const ENV_PREFIX: &str = "TRENDING";

const MINUTE: u64 = 60;
const DAY: u64 = 24 * 60 * MINUTE;

/// Trending worker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Content database
    pub database: DatabaseSettings,

    /// Logging
    pub telemetry: TelemetryConfig,

    /// Scoring and ranking
    pub ranking: RankingConfig,

    /// Scheduler settings and job table
    pub scheduler: SchedulerConfig,
}

impl WorkerConfig {
    /// Load configuration from defaults, config files and environment
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        let mut sources = ConfigSources::new(ENV_PREFIX);
        if let Some(path) = explicit_file {
            sources = sources.with_file(path);
        }

        let config: WorkerConfig =
            load_layered(&sources).context("Failed to load worker configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        self.telemetry.validate()?;

        if self.ranking.view_fetch_limit == 0 {
            bail!("ranking.view_fetch_limit must be greater than zero");
        }
        self.scheduler.validate()
    }

    /// Enabled jobs, in table order
    pub fn enabled_jobs(&self) -> impl Iterator<Item = &JobConfig> {
        self.scheduler.jobs.iter().filter(|job| job.enabled)
    }
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection URL, usually supplied through `DATABASE_URL`
    pub url: String,

    pub max_connections: u32,

    pub min_connections: u32,

    #[serde(
        rename = "acquire_timeout_secs",
        serialize_with = "serialize_duration_as_seconds",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub acquire_timeout: Duration,

    #[serde(
        rename = "statement_timeout_secs",
        serialize_with = "serialize_duration_as_seconds",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub statement_timeout: Duration,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let pool = DatabaseConfig::default();
        Self {
            url: pool.url,
            max_connections: pool.max_connections,
            min_connections: pool.min_connections,
            acquire_timeout: pool.acquire_timeout,
            statement_timeout: pool.statement_timeout,
        }
    }
}

impl DatabaseSettings {
    /// Pool configuration for these settings
    pub fn pool_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            acquire_timeout: self.acquire_timeout,
            statement_timeout: self.statement_timeout,
            ..DatabaseConfig::default()
        }
    }
}

/// Scoring and ranking settings shared by every job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Most recent view rows read per partition and run
    pub view_fetch_limit: usize,

    /// Ordering among items with equal scores
    pub tie_break: TieBreak,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            view_fetch_limit: 100,
            tie_break: TieBreak::default(),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Whether `run` starts the timers
    pub enabled: bool,

    /// Upper bound on one job run, across all of its scopes
    #[serde(
        rename = "job_timeout_secs",
        serialize_with = "serialize_duration_as_seconds",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub job_timeout: Duration,

    /// Time in-flight runs get to finish on shutdown
    #[serde(
        rename = "shutdown_grace_secs",
        serialize_with = "serialize_duration_as_seconds",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub shutdown_grace: Duration,

    /// Partitions of one multi-scope job ranked at the same time
    pub max_concurrent_scopes: usize,

    /// Job table
    pub jobs: Vec<JobConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            job_timeout: Duration::from_secs(5 * MINUTE),
            shutdown_grace: Duration::from_secs(30),
            max_concurrent_scopes: num_cpus::get(),
            jobs: default_jobs(),
        }
    }
}

impl SchedulerConfig {
    fn validate(&self) -> Result<()> {
        if self.job_timeout.is_zero() {
            bail!("scheduler.job_timeout_secs must be greater than zero");
        }
        if self.max_concurrent_scopes == 0 {
            bail!("scheduler.max_concurrent_scopes must be greater than zero");
        }

        let mut names = HashSet::new();
        let mut partitions = HashSet::new();
        for job in &self.jobs {
            job.validate()?;

            if !names.insert(job.name.as_str()) {
                bail!("duplicate job name '{}'", job.name);
            }
            // two live jobs on one partition would race on its delete + insert
            if job.enabled && !partitions.insert((job.target, job.period)) {
                bail!(
                    "job '{}' targets {} / {} which another enabled job already ranks",
                    job.name,
                    job.target,
                    job.period
                );
            }
        }
        Ok(())
    }
}

/// One row of the job table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,

    pub target: ScopeTarget,

    pub period: Period,

    /// Time between two runs
    #[serde(
        rename = "interval_secs",
        serialize_with = "serialize_duration_as_seconds",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub interval: Duration,

    /// Length of the engagement window ending at run time
    #[serde(
        rename = "window_secs",
        serialize_with = "serialize_duration_as_seconds",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub window: Duration,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Run once right after start instead of waiting a full interval
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

impl JobConfig {
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
            enabled: true,
            run_on_start: true,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("job name must not be empty");
        }
        if self.interval.is_zero() {
            bail!("job '{}': interval_secs must be greater than zero", self.name);
        }
        if self.window.is_zero() {
            bail!("job '{}': window_secs must be greater than zero", self.name);
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

/// Built-in job table
pub fn default_jobs() -> Vec<JobConfig> {
    let realtime_window = Duration::from_secs(10 * MINUTE);
    vec![
        JobConfig::new(
            "global-realtime",
            ScopeTarget::Global,
            Period::Realtime,
            Duration::from_secs(30),
            realtime_window,
        ),
        JobConfig::new(
            "global-weekly",
            ScopeTarget::Global,
            Period::Weekly,
            Duration::from_secs(DAY),
            Duration::from_secs(7 * DAY),
        ),
        JobConfig::new(
            "global-monthly",
            ScopeTarget::Global,
            Period::Monthly,
            Duration::from_secs(7 * DAY),
            Duration::from_secs(30 * DAY),
        ),
        JobConfig::new(
            "category-realtime",
            ScopeTarget::Categories,
            Period::Realtime,
            Duration::from_secs(5 * MINUTE),
            realtime_window,
        ),
        JobConfig::new(
            "subcategory-realtime",
            ScopeTarget::SubCategories,
            Period::Realtime,
            Duration::from_secs(5 * MINUTE),
            realtime_window,
        ),
    ]
}
