//! Doodling Trending Worker
//!
//! Recomputes trending leaderboards on a fixed schedule.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use doodling_common::{format_duration, init_tracing};
use doodling_domain::{Period, Scope};
use doodling_infrastructure::{DatabasePool, LeaderboardRepository, PgLeaderboardRepository};
use doodling_worker::{RunOutcome, TrendingWorker, WorkerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "trending-worker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "TRENDING_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Log as JSON instead of pretty text
    #[arg(long, env = "TRENDING_JSON_LOGS", global = true)]
    json_logs: Option<bool>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler until Ctrl-C (default)
    Run {
        /// Enable scheduler
        #[arg(long, env = "TRENDING_SCHEDULER_ENABLED")]
        scheduler: Option<bool>,

        /// Print metrics interval (seconds)
        #[arg(long, env = "METRICS_INTERVAL", default_value = "60")]
        metrics_interval: u64,
    },

    /// Run one job immediately and exit
    RunOnce {
        /// Job name from the job table
        #[arg(long)]
        job: String,
    },

    /// Print a materialized leaderboard
    Top {
        /// global, category:<id> or subcategory:<id>
        #[arg(long, default_value = "global")]
        scope: Scope,

        /// realtime, weekly or monthly
        #[arg(long, default_value = "realtime")]
        period: Period,

        /// Number of entries to print
        #[arg(long)]
        limit: Option<usize>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective job table
    Jobs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = WorkerConfig::load(args.config.as_deref())?;
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if let Some(json_logs) = args.json_logs {
        config.telemetry.json_logging = json_logs;
    }

    init_tracing(&config.telemetry)?;

    let command = args.command.unwrap_or(Command::Run {
        scheduler: None,
        metrics_interval: 60,
    });

    match command {
        Command::Run {
            scheduler,
            metrics_interval,
        } => {
            if let Some(enabled) = scheduler {
                config.scheduler.enabled = enabled;
            }
            run(config, Duration::from_secs(metrics_interval.max(1))).await
        }
        Command::RunOnce { job } => run_once(config, &job).await,
        Command::Top {
            scope,
            period,
            limit,
            json,
        } => top(config, scope, period, limit, json).await,
        Command::Jobs => {
            print_jobs(&config);
            Ok(())
        }
    }
}

async fn run(config: WorkerConfig, metrics_interval: Duration) -> Result<()> {
    info!(
        service = %config.telemetry.service_name,
        scheduler_enabled = config.scheduler.enabled,
        jobs = config.enabled_jobs().count(),
        "Starting trending worker"
    );

    let mut worker = TrendingWorker::connect(config).await?;

    // Get shutdown handle
    let shutdown_handle = worker.shutdown_handle();
    let scheduler = worker.scheduler().clone();
    let database = worker.database().cloned();

    // Setup graceful shutdown
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Received shutdown signal");
        let _ = shutdown_handle.send(()).await;
    });

    // Start metrics reporting
    let metrics_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(metrics_interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            for (job, snapshot) in scheduler.metrics() {
                snapshot.log(&job);
            }
            if let Some(database) = &database {
                let stats = database.stats();
                info!(size = stats.size, idle = stats.idle, "Database pool");
            }
        }
    });

    let result = worker.start().await;

    // Cancel metrics reporting
    metrics_handle.abort();

    info!("Trending worker stopped");
    result
}

async fn run_once(config: WorkerConfig, job: &str) -> Result<()> {
    let worker = TrendingWorker::connect(config).await?;
    let outcome = worker.scheduler().trigger(job).await;
    worker.close().await;

    match outcome? {
        RunOutcome::Completed(report) => {
            println!(
                "{}: {} partition(s), {} entries written in {}",
                report.job,
                report.scopes,
                report.entries_written,
                format_duration(report.duration)
            );
            Ok(())
        }
        RunOutcome::Skipped => bail!("job '{}' is already running", job),
        RunOutcome::Failed(e) => Err(e).with_context(|| format!("job '{}' failed", job)),
    }
}

async fn top(
    config: WorkerConfig,
    scope: Scope,
    period: Period,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let database = DatabasePool::new(&config.database.pool_config())
        .await
        .context("Failed to connect to the content database")?;
    let leaderboard = PgLeaderboardRepository::new(database.pool().clone());

    let entries = leaderboard.top(scope, period, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No entries for {} / {}", scope, period);
    } else {
        println!("{:>5}  {:>12}", "RANK", "CONTENT");
        for entry in &entries {
            println!("{:>5}  {:>12}", entry.rank, entry.content_id.get());
        }
    }

    database.close().await;
    Ok(())
}

fn print_jobs(config: &WorkerConfig) {
    println!(
        "{:<24} {:<14} {:<9} {:>9} {:>9} {:<8} {}",
        "NAME", "TARGET", "PERIOD", "INTERVAL", "WINDOW", "ENABLED", "RUN ON START"
    );
    for job in &config.scheduler.jobs {
        println!(
            "{:<24} {:<14} {:<9} {:>9} {:>9} {:<8} {}",
            job.name,
            job.target.as_str(),
            job.period.as_str(),
            format_duration(job.interval),
            format_duration(job.window),
            job.enabled,
            job.run_on_start
        );
    }
}
