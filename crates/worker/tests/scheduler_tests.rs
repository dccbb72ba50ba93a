//! Timer-driven scheduler tests
//!
//! All tests run on a paused tokio clock, so intervals of minutes take no
//! real time.

use doodling_domain::{CategoryId, Period, Scope};
use doodling_infrastructure::{EngagementRepository, LeaderboardRepository};
use doodling_testing::{
    at, ranked, FailingStore, InMemoryEngagementStore, InMemoryLeaderboard, ScenarioBuilder,
    SlowStore,
};
use doodling_worker::clock::FixedClock;
use doodling_worker::config::RankingConfig;
use doodling_worker::{
    JobConfig, JobError, RankingJob, RankingPipeline, RunOutcome, RunnerSettings, Scheduler,
    ScopeTarget, TrendingWorker, WorkerConfig,
};
use std::sync::Arc;
use std::time::Duration;

const SECOND: Duration = Duration::from_secs(1);

fn realtime(name: &str, interval_secs: u64) -> RankingJob {
    RankingJob::new(
        name,
        ScopeTarget::Global,
        Period::Realtime,
        Duration::from_secs(interval_secs),
        Duration::from_secs(600),
    )
}

fn settings(job_timeout_secs: u64) -> RunnerSettings {
    RunnerSettings {
        job_timeout: Duration::from_secs(job_timeout_secs),
        max_concurrent_scopes: 4,
    }
}

fn scheduler_over(
    jobs: Vec<RankingJob>,
    events: Arc<dyn EngagementRepository>,
    leaderboard: Arc<dyn LeaderboardRepository>,
    catalog: Arc<InMemoryEngagementStore>,
    job_timeout_secs: u64,
) -> Scheduler {
    let pipeline = Arc::new(RankingPipeline::new(
        events,
        leaderboard,
        &RankingConfig::default(),
    ));
    Scheduler::new(
        jobs,
        pipeline,
        catalog,
        Arc::new(FixedClock(at(600))),
        settings(job_timeout_secs),
    )
}

fn sample_store() -> Arc<InMemoryEngagementStore> {
    Arc::new(ScenarioBuilder::new().at(10).views(1, 2).views(2, 1).into_store())
}

#[tokio::test(start_paused = true)]
async fn test_job_runs_on_every_interval() {
    let store = sample_store();
    let board = Arc::new(InMemoryLeaderboard::new());
    let scheduler = scheduler_over(
        vec![realtime("global-realtime", 30)],
        store.clone(),
        board.clone(),
        store,
        60,
    );

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(95)).await;
    assert!(scheduler.shutdown(SECOND).await);

    // ticks at 0, 30, 60 and 90 seconds
    let metrics = scheduler.runner("global-realtime").unwrap().metrics().snapshot();
    assert_eq!(metrics.runs, 4);
    assert_eq!(metrics.succeeded, 4);
    assert_eq!(metrics.skipped, 0);
    assert_eq!(board.replace_count(), 4);
    assert_eq!(board.entries(Scope::Global, Period::Realtime).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_on_start_disabled_waits_one_interval() {
    let store = sample_store();
    let board = Arc::new(InMemoryLeaderboard::new());
    let scheduler = scheduler_over(
        vec![realtime("weekly", 30).with_run_on_start(false)],
        store.clone(),
        board.clone(),
        store,
        60,
    );

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(board.replace_count(), 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(board.replace_count(), 1);
    scheduler.shutdown(SECOND).await;
}

#[tokio::test(start_paused = true)]
async fn test_tick_during_run_is_skipped() {
    let store = sample_store();
    let slow = Arc::new(SlowStore::new(
        ScenarioBuilder::new().at(10).views(1, 1).into_store(),
        Duration::from_secs(50),
    ));
    let board = Arc::new(InMemoryLeaderboard::new());
    let scheduler = scheduler_over(
        vec![realtime("slow", 30)],
        slow.clone(),
        board,
        store,
        600,
    );

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(100)).await;

    // run 1 covers 0..50 (tick at 30 skipped), run 2 starts at 60 (tick at 90 skipped)
    let metrics = scheduler.runner("slow").unwrap().metrics().snapshot();
    assert_eq!(metrics.runs, 2);
    assert_eq!(metrics.succeeded, 1);
    assert_eq!(metrics.skipped, 2);
    assert_eq!(slow.peak_in_flight(), 1);

    scheduler.shutdown(SECOND).await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_trigger_goes_through_overlap_guard() {
    let store = sample_store();
    let slow = Arc::new(SlowStore::new(InMemoryEngagementStore::new(), Duration::from_secs(50)));
    let scheduler = scheduler_over(
        vec![realtime("slow", 300)],
        slow,
        Arc::new(InMemoryLeaderboard::new()),
        store,
        600,
    );

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let outcome = scheduler.trigger("slow").await.unwrap();
    assert!(outcome.is_skipped());
    scheduler.shutdown(SECOND).await;
}

#[tokio::test(start_paused = true)]
async fn test_failing_job_does_not_stop_others() {
    let healthy = sample_store();
    let failing = Arc::new(FailingStore::always(InMemoryEngagementStore::new()));
    let board = Arc::new(InMemoryLeaderboard::new());

    let healthy_pipeline = Arc::new(RankingPipeline::new(
        healthy.clone(),
        board.clone(),
        &RankingConfig::default(),
    ));
    let failing_pipeline = Arc::new(RankingPipeline::new(
        failing,
        board.clone(),
        &RankingConfig::default(),
    ));
    let clock = Arc::new(FixedClock(at(600)));
    let good = Scheduler::new(
        vec![realtime("good", 30)],
        healthy_pipeline,
        healthy.clone(),
        clock.clone(),
        settings(60),
    );
    let bad = Scheduler::new(
        vec![realtime("bad", 30)],
        failing_pipeline,
        healthy,
        clock,
        settings(60),
    );

    good.start().unwrap();
    bad.start().unwrap();
    tokio::time::sleep(Duration::from_secs(65)).await;
    good.shutdown(SECOND).await;
    bad.shutdown(SECOND).await;

    let bad_metrics = bad.runner("bad").unwrap().metrics().snapshot();
    assert_eq!(bad_metrics.failed, 3);
    assert!(bad_metrics.last_error.unwrap().contains("injected failure"));
    assert_eq!(good.runner("good").unwrap().metrics().succeeded(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_next_tick_repairs_after_failure() {
    let store = Arc::new(FailingStore::new(
        ScenarioBuilder::new().at(10).views(3, 1).into_store(),
    ));
    let board = Arc::new(InMemoryLeaderboard::new());
    store.set_fail_all(true);
    let scheduler = scheduler_over(
        vec![realtime("flaky", 30)],
        store.clone(),
        board.clone(),
        Arc::new(InMemoryEngagementStore::new()),
        60,
    );

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(board.entries(Scope::Global, Period::Realtime).is_empty());

    store.set_fail_all(false);
    tokio::time::sleep(Duration::from_secs(30)).await;
    scheduler.shutdown(SECOND).await;

    let metrics = scheduler.runner("flaky").unwrap().metrics().snapshot();
    assert_eq!(metrics.failed, 1);
    assert_eq!(metrics.succeeded, 1);
    assert_eq!(board.entries(Scope::Global, Period::Realtime).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_leaves_board_intact() {
    let slow = Arc::new(SlowStore::new(
        ScenarioBuilder::new().at(10).views(9, 1).into_store(),
        Duration::from_secs(120),
    ));
    let board = Arc::new(InMemoryLeaderboard::new());
    board.seed(Scope::Global, Period::Realtime, ranked(&[1, 2]));
    let scheduler = scheduler_over(
        vec![realtime("stuck", 300)],
        slow,
        board.clone(),
        Arc::new(InMemoryEngagementStore::new()),
        60,
    );

    let outcome = scheduler.trigger("stuck").await.unwrap();

    assert!(matches!(outcome.error(), Some(JobError::TimedOut(t)) if *t == Duration::from_secs(60)));
    assert_eq!(board.replace_count(), 0);
    assert_eq!(board.entries(Scope::Global, Period::Realtime).len(), 2);
    assert_eq!(scheduler.runner("stuck").unwrap().metrics().timed_out(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_run_before_delete() {
    let slow = Arc::new(SlowStore::new(
        ScenarioBuilder::new().at(10).views(9, 1).into_store(),
        Duration::from_secs(50),
    ));
    let board = Arc::new(InMemoryLeaderboard::new());
    board.seed(Scope::Global, Period::Realtime, ranked(&[1]));
    let scheduler = scheduler_over(
        vec![realtime("slow", 30)],
        slow,
        board.clone(),
        Arc::new(InMemoryEngagementStore::new()),
        600,
    );

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(scheduler.shutdown(Duration::from_secs(5)).await);

    let metrics = scheduler.runner("slow").unwrap().metrics().snapshot();
    assert_eq!(metrics.cancelled, 1);
    assert_eq!(metrics.failed, 0);
    assert_eq!(board.replace_count(), 0);
    assert_eq!(board.entries(Scope::Global, Period::Realtime).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_after_grace() {
    let store = sample_store();
    let slow_board = Arc::new(SlowStore::new(InMemoryLeaderboard::new(), Duration::from_secs(60)));
    let scheduler = scheduler_over(
        vec![realtime("writer", 300)],
        store.clone(),
        slow_board.clone(),
        store,
        600,
    );

    scheduler.start().unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    // the run is inside the replace, which does not observe cancellation
    assert!(!scheduler.shutdown(Duration::from_secs(5)).await);
    assert_eq!(slow_board.inner().replace_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_category_does_not_block_others() {
    let store = Arc::new(FailingStore::new(
        ScenarioBuilder::new()
            .at(10)
            .in_category(5)
            .views(1, 1)
            .in_category(7)
            .views(2, 1)
            .into_store(),
    ));
    store.inner().set_categories([5, 7]);
    store.fail_scope(Scope::Category(CategoryId::new(5)));
    let board = Arc::new(InMemoryLeaderboard::new());
    let pipeline = Arc::new(RankingPipeline::new(
        store.clone(),
        board.clone(),
        &RankingConfig::default(),
    ));
    let scheduler = Scheduler::new(
        vec![RankingJob::new(
            "category-realtime",
            ScopeTarget::Categories,
            Period::Realtime,
            Duration::from_secs(300),
            Duration::from_secs(600),
        )],
        pipeline,
        store,
        Arc::new(FixedClock(at(600))),
        settings(60),
    );

    let outcome = scheduler.trigger("category-realtime").await.unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Failed(JobError::ScopesFailed { failed: 1, total: 2 })
    ));
    assert_eq!(
        board.content_ids(Scope::Category(CategoryId::new(7)), Period::Realtime).len(),
        1
    );
    assert!(board
        .entries(Scope::Category(CategoryId::new(5)), Period::Realtime)
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_worker_runs_until_shutdown_signal() {
    let store = sample_store();
    let board = Arc::new(InMemoryLeaderboard::new());
    let mut config = WorkerConfig::default();
    config.scheduler.jobs = vec![JobConfig::new(
        "global-realtime",
        ScopeTarget::Global,
        Period::Realtime,
        Duration::from_secs(30),
        // wide enough to cover the fixture timestamps from the system clock
        Duration::from_secs(100 * 365 * 24 * 3600),
    )];

    let mut worker = TrendingWorker::new(config, store.clone(), board.clone(), store);
    let shutdown = worker.shutdown_handle();
    let scheduler = Arc::clone(worker.scheduler());

    let running = tokio::spawn(async move { worker.start().await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    shutdown.send(()).await.unwrap();

    running.await.unwrap().unwrap();
    assert_eq!(scheduler.metrics()[0].1.succeeded, 1);
    assert_eq!(board.entries(Scope::Global, Period::Realtime).len(), 2);
}
