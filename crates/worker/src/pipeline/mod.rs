//! Aggregate, rank and materialize one leaderboard partition.

mod aggregator;
mod materializer;
mod ranker;

pub use aggregator::SignalAggregator;
pub use materializer::LeaderboardMaterializer;
pub use ranker::Ranker;

use doodling_domain::{Period, RankEntry, Scope, ScopeKind, TimeWindow};
use doodling_infrastructure::{EngagementRepository, LeaderboardRepository, ReplaceSummary};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::RankingConfig;
use crate::error::{JobError, JobResult};

/// Outcome of ranking one partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionReport {
    pub scope: Scope,
    pub period: Period,
    /// Items that made it into the ranking
    pub ranked: usize,
    pub summary: ReplaceSummary,
}

/// The ranking pipeline shared by every job
pub struct RankingPipeline {
    aggregator: SignalAggregator,
    ranker: Ranker,
    materializer: LeaderboardMaterializer,
    leaderboard: Arc<dyn LeaderboardRepository>,
}

impl RankingPipeline {
    pub fn new(
        events: Arc<dyn EngagementRepository>,
        leaderboard: Arc<dyn LeaderboardRepository>,
        ranking: &RankingConfig,
    ) -> Self {
        Self {
            aggregator: SignalAggregator::new(events, ranking.view_fetch_limit),
            ranker: Ranker::new(ranking.tie_break),
            materializer: LeaderboardMaterializer::new(Arc::clone(&leaderboard)),
            leaderboard,
        }
    }

    /// Recompute the `(scope, period)` partition from engagement in `window`.
    ///
    /// Cancellation is observed while reading and once more right before the
    /// partition is replaced; after that the replace runs to completion.
    pub async fn run(
        &self,
        scope: Scope,
        period: Period,
        window: TimeWindow,
        cancel: &CancellationToken,
    ) -> JobResult<PartitionReport> {
        let tally = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            tally = self.aggregator.aggregate(scope, window) => tally?,
        };

        let ranked = self.ranker.rank(&tally);

        if cancel.is_cancelled() {
            debug!(scope = %scope, period = %period, "Cancelled before replacing partition");
            return Err(JobError::Cancelled);
        }

        let summary = self.materializer.materialize(scope, period, &ranked).await?;

        Ok(PartitionReport {
            scope,
            period,
            ranked: ranked.len(),
            summary,
        })
    }

    /// Current leaderboard of a partition, best first
    pub async fn top(
        &self,
        scope: Scope,
        period: Period,
        limit: Option<usize>,
    ) -> JobResult<Vec<RankEntry>> {
        Ok(self.leaderboard.top(scope, period, limit).await?)
    }

    /// Empty every stored `kind` partition of `period` whose scope is not in
    /// `live`, and return the scopes that were cleared.
    ///
    /// Categories that get disabled drop out of the catalog; without this
    /// their last snapshot would stay readable forever.
    pub async fn clear_stale(
        &self,
        kind: ScopeKind,
        period: Period,
        live: &[Scope],
    ) -> JobResult<Vec<Scope>> {
        let live: HashSet<Scope> = live.iter().copied().collect();
        let stale: Vec<Scope> = self
            .leaderboard
            .partitions(kind, period)
            .await?
            .into_iter()
            .filter(|scope| !live.contains(scope))
            .collect();

        for scope in &stale {
            let summary = self.materializer.materialize(*scope, period, &[]).await?;
            debug!(scope = %scope, period = %period, deleted = summary.deleted, "Stale partition cleared");
        }
        Ok(stale)
    }
}
