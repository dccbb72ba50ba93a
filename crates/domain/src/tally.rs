//! Per-run engagement score tally.
//!
//! A tally is built from zero on every job run and never persisted. Keys keep
//! their insertion order so that a ranking without a secondary sort key is
//! still stable against the order events were read in.

use crate::identifiers::ContentId;
use indexmap::IndexMap;

/// Mapping from content item to its aggregated score
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreTally {
    scores: IndexMap<ContentId, u64>,
}

impl ScoreTally {
    /// Create an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one point for a surfacing signal (a view). May introduce the item.
    pub fn record(&mut self, content_id: ContentId) {
        *self.scores.entry(content_id).or_insert(0) += 1;
    }

    /// Add `points` to an item that is already in the tally.
    ///
    /// Amplifying signals (comments, likes) never introduce an item on their
    /// own; returns `false` and leaves the tally untouched when the item is
    /// absent.
    pub fn amplify(&mut self, content_id: ContentId, points: u64) -> bool {
        match self.scores.get_mut(&content_id) {
            Some(score) => {
                *score = score.saturating_add(points);
                true
            }
            None => false,
        }
    }

    /// Score of an item, zero when it never entered the tally
    pub fn score(&self, content_id: ContentId) -> u64 {
        self.scores.get(&content_id).copied().unwrap_or(0)
    }

    /// Whether the item has been surfaced
    pub fn contains(&self, content_id: ContentId) -> bool {
        self.scores.contains_key(&content_id)
    }

    /// Surfaced items in insertion order
    pub fn content_ids(&self) -> Vec<ContentId> {
        self.scores.keys().copied().collect()
    }

    /// Number of distinct scored items
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether nothing has been surfaced
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterate `(item, score)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (ContentId, u64)> + '_ {
        self.scores.iter().map(|(id, score)| (*id, *score))
    }

    /// Sum of all scores
    pub fn total(&self) -> u64 {
        self.scores.values().sum()
    }
}

impl FromIterator<ContentId> for ScoreTally {
    fn from_iter<I: IntoIterator<Item = ContentId>>(iter: I) -> Self {
        let mut tally = Self::new();
        for content_id in iter {
            tally.record(content_id);
        }
        tally
    }
}
