//! Ranking: a score tally to dense ranks

use doodling_domain::{ContentId, RankedItem, ScoreTally, TieBreak};
use std::cmp::Ordering;

/// Orders a tally by score, highest first
#[derive(Debug, Clone, Copy, Default)]
pub struct Ranker {
    tie_break: TieBreak,
}

impl Ranker {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    /// Rank every scored item of the tally.
    ///
    /// Ranks are `1..=k` with no gaps and no shared ranks, even for equal
    /// scores. Items with a zero score are left out.
    pub fn rank(&self, tally: &ScoreTally) -> Vec<RankedItem> {
        let mut scored: Vec<(usize, ContentId, u64)> = tally
            .iter()
            .enumerate()
            .filter(|(_, (_, score))| *score > 0)
            .map(|(position, (content_id, score))| (position, content_id, score))
            .collect();

        scored.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| self.break_tie(a, b)));

        scored
            .into_iter()
            .zip(1u32..)
            .map(|((_, content_id, score), rank)| RankedItem {
                content_id,
                score,
                rank,
            })
            .collect()
    }

    fn break_tie(&self, a: &(usize, ContentId, u64), b: &(usize, ContentId, u64)) -> Ordering {
        match self.tie_break {
            TieBreak::ContentIdAscending => a.1.cmp(&b.1),
            TieBreak::InsertionOrder => a.0.cmp(&b.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doodling_domain::is_dense;
    use proptest::prelude::*;

    fn tally(entries: &[(i64, u64)]) -> ScoreTally {
        let mut tally = ScoreTally::new();
        for (id, score) in entries {
            let id = ContentId::new(*id);
            tally.record(id);
            tally.amplify(id, score - 1);
        }
        tally
    }

    fn ids(items: &[RankedItem]) -> Vec<i64> {
        items.iter().map(|i| i.content_id.get()).collect()
    }

    #[test]
    fn test_highest_score_first() {
        let ranked = Ranker::default().rank(&tally(&[(1, 5), (2, 6)]));

        assert_eq!(ids(&ranked), vec![2, 1]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].score, 6);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn test_ties_by_content_id() {
        let ranked = Ranker::new(TieBreak::ContentIdAscending).rank(&tally(&[(9, 2), (4, 2), (7, 3)]));
        assert_eq!(ids(&ranked), vec![7, 4, 9]);
        assert_eq!(ranked.iter().map(|i| i.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_ties_by_insertion_order() {
        let ranked = Ranker::new(TieBreak::InsertionOrder).rank(&tally(&[(9, 2), (4, 2), (7, 3)]));
        assert_eq!(ids(&ranked), vec![7, 9, 4]);
    }

    #[test]
    fn test_empty_tally() {
        assert!(Ranker::default().rank(&ScoreTally::new()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_ranks_are_dense(entries in proptest::collection::hash_map(1i64..500, 1u64..50, 0..80)) {
            let entries: Vec<(i64, u64)> = entries.into_iter().collect();
            let ranked = Ranker::default().rank(&tally(&entries));

            prop_assert_eq!(ranked.len(), entries.len());
            prop_assert!(is_dense(ranked.iter().map(|i| i.rank)));
            prop_assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        }

        #[test]
        fn prop_ranking_is_deterministic(entries in proptest::collection::hash_map(1i64..50, 1u64..5, 0..40)) {
            let forward: Vec<(i64, u64)> = entries.into_iter().collect();
            let mut backward = forward.clone();
            backward.reverse();

            let ranker = Ranker::new(TieBreak::ContentIdAscending);
            prop_assert_eq!(ranker.rank(&tally(&forward)), ranker.rank(&tally(&backward)));
        }
    }
}
