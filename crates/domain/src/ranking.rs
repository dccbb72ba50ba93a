//! Ranked output and persisted leaderboard rows.

use crate::identifiers::ContentId;
use crate::scope::{Period, Scope};
use serde::{Deserialize, Serialize};

/// Secondary ordering for items with equal scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Lower content id ranks first. Reproducible across runs.
    #[default]
    ContentIdAscending,
    /// Keep the order in which items entered the tally
    InsertionOrder,
}

/// One item of a computed ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    /// Ranked item
    pub content_id: ContentId,
    /// Aggregated engagement score
    pub score: u64,
    /// Dense 1-based rank
    pub rank: u32,
}

/// A persisted leaderboard row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    /// Partition scope
    pub scope: Scope,
    /// Partition period
    pub period: Period,
    /// Ranked item
    pub content_id: ContentId,
    /// Dense 1-based rank within the partition
    pub rank: u32,
}

impl RankEntry {
    /// Build the persisted row for a ranked item
    pub fn from_item(scope: Scope, period: Period, item: &RankedItem) -> Self {
        Self {
            scope,
            period,
            content_id: item.content_id,
            rank: item.rank,
        }
    }
}

/// Check that `ranks` is exactly `{1..=k}` for `k = ranks.len()`, in any order.
pub fn is_dense<I>(ranks: I) -> bool
where
    I: IntoIterator<Item = u32>,
{
    let mut ranks: Vec<u32> = ranks.into_iter().collect();
    ranks.sort_unstable();
    ranks
        .iter()
        .enumerate()
        .all(|(index, rank)| *rank as usize == index + 1)
}
