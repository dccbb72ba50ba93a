//! Leaderboard materialization

use doodling_domain::{is_dense, Period, RankedItem, Scope};
use doodling_infrastructure::{LeaderboardRepository, ReplaceSummary};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::{JobError, JobResult};

/// Replaces one leaderboard partition with a new ranking
pub struct LeaderboardMaterializer {
    leaderboard: Arc<dyn LeaderboardRepository>,
}

impl LeaderboardMaterializer {
    pub fn new(leaderboard: Arc<dyn LeaderboardRepository>) -> Self {
        Self { leaderboard }
    }

    /// Swap the `(scope, period)` partition for `items`.
    ///
    /// Input that is not a dense ranking of distinct items is rejected
    /// before anything is deleted. An empty `items` clears the partition.
    pub async fn materialize(
        &self,
        scope: Scope,
        period: Period,
        items: &[RankedItem],
    ) -> JobResult<ReplaceSummary> {
        validate(items)?;

        let summary = self
            .leaderboard
            .replace_partition(scope, period, items)
            .await?;

        debug!(
            scope = %scope,
            period = %period,
            deleted = summary.deleted,
            written = summary.written,
            "Leaderboard partition materialized"
        );
        Ok(summary)
    }
}

fn validate(items: &[RankedItem]) -> JobResult<()> {
    if !is_dense(items.iter().map(|item| item.rank)) {
        return Err(JobError::InvalidRanking(format!(
            "ranks of {} items are not 1..={}",
            items.len(),
            items.len()
        )));
    }

    let mut seen = HashSet::with_capacity(items.len());
    if let Some(duplicate) = items.iter().find(|item| !seen.insert(item.content_id)) {
        return Err(JobError::InvalidRanking(format!(
            "content {} ranked twice",
            duplicate.content_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use doodling_domain::ContentId;
    use doodling_testing::{ranked, InMemoryLeaderboard};

    #[tokio::test]
    async fn test_gap_in_ranks_is_rejected_before_delete() {
        let board = Arc::new(InMemoryLeaderboard::new());
        board.seed(Scope::Global, Period::Weekly, ranked(&[1, 2]));
        let materializer = LeaderboardMaterializer::new(board.clone());

        let mut items = ranked(&[5, 6]);
        items[1].rank = 3;
        let result = materializer
            .materialize(Scope::Global, Period::Weekly, &items)
            .await;

        assert!(matches!(result, Err(JobError::InvalidRanking(_))));
        assert_eq!(board.replace_count(), 0);
        assert_eq!(board.content_ids(Scope::Global, Period::Weekly).len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_item_is_rejected() {
        let board = Arc::new(InMemoryLeaderboard::new());
        let materializer = LeaderboardMaterializer::new(board.clone());

        let mut items = ranked(&[5, 6]);
        items[1].content_id = ContentId::new(5);

        let result = materializer
            .materialize(Scope::Global, Period::Weekly, &items)
            .await;
        assert!(matches!(result, Err(JobError::InvalidRanking(_))));
    }

    #[tokio::test]
    async fn test_empty_ranking_clears_partition() {
        let board = Arc::new(InMemoryLeaderboard::new());
        board.seed(Scope::Global, Period::Realtime, ranked(&[1, 2, 3]));
        let materializer = LeaderboardMaterializer::new(board.clone());

        let summary = materializer
            .materialize(Scope::Global, Period::Realtime, &[])
            .await
            .unwrap();

        assert_eq!(summary.deleted, 3);
        assert_eq!(summary.written, 0);
        assert!(board.entries(Scope::Global, Period::Realtime).is_empty());
    }
}
