//! Leaderboard persistence.
//!
//! Rows live in `top_posts`, one row per `(scope_kind, scope_id, period,
//! post_id)`. The global scope is stored with `scope_id = 0`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument};

use doodling_domain::{ContentId, Period, RankEntry, RankedItem, Scope, ScopeKind};

use crate::database::TransactionExt;
use crate::{Error, Result};

/// Outcome of a partition replace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Rows removed from the previous snapshot
    pub deleted: u64,
    /// Rows written for the new snapshot
    pub written: u64,
}

/// Read/write access to the materialized leaderboard.
#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    /// Replace every row of the `(scope, period)` partition with `items`.
    ///
    /// Implementations must make the replace atomic for readers: either the
    /// old snapshot or the new one is visible, never a mix. Rows of other
    /// partitions are never touched.
    async fn replace_partition(
        &self,
        scope: Scope,
        period: Period,
        items: &[RankedItem],
    ) -> Result<ReplaceSummary>;

    /// Entries of a partition in ascending rank order, optionally the top `limit`.
    async fn top(&self, scope: Scope, period: Period, limit: Option<usize>)
        -> Result<Vec<RankEntry>>;

    /// Scopes of `kind` that hold at least one row for `period`, ordered by key.
    async fn partitions(&self, kind: ScopeKind, period: Period) -> Result<Vec<Scope>>;
}

/// PostgreSQL implementation of LeaderboardRepository.
pub struct PgLeaderboardRepository {
    pool: PgPool,
}

impl PgLeaderboardRepository {
    /// Create a new repository over the pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn replace_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        scope: Scope,
        period: Period,
        items: &[RankedItem],
    ) -> Result<ReplaceSummary> {
        let deleted = sqlx::query(
            "DELETE FROM top_posts WHERE scope_kind = $1 AND scope_id = $2 AND period = $3",
        )
        .bind(scope.kind().as_str())
        .bind(scope.scope_key())
        .bind(period.as_str())
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if items.is_empty() {
            return Ok(ReplaceSummary {
                deleted,
                written: 0,
            });
        }

        let mut post_ids = Vec::with_capacity(items.len());
        let mut ranks = Vec::with_capacity(items.len());
        let mut scores = Vec::with_capacity(items.len());
        for item in items {
            post_ids.push(item.content_id.get());
            ranks.push(i32::try_from(item.rank).map_err(|_| {
                Error::InvalidData(format!("rank {} does not fit the rank column", item.rank))
            })?);
            scores.push(i64::try_from(item.score).unwrap_or(i64::MAX));
        }

        let written = sqlx::query(
            r#"
            INSERT INTO top_posts (scope_kind, scope_id, period, post_id, rank, score, computed_at)
            SELECT $1, $2, $3, t.post_id, t.rank, t.score, $4
            FROM UNNEST($5::BIGINT[], $6::INT[], $7::BIGINT[]) AS t(post_id, rank, score)
            ON CONFLICT (scope_kind, scope_id, period, post_id)
            DO UPDATE SET rank = EXCLUDED.rank,
                          score = EXCLUDED.score,
                          computed_at = EXCLUDED.computed_at
            "#,
        )
        .bind(scope.kind().as_str())
        .bind(scope.scope_key())
        .bind(period.as_str())
        .bind(Utc::now())
        .bind(&post_ids)
        .bind(&ranks)
        .bind(&scores)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        Ok(ReplaceSummary { deleted, written })
    }
}

#[async_trait]
impl LeaderboardRepository for PgLeaderboardRepository {
    #[instrument(skip(self, items), fields(scope = %scope, period = %period, items = items.len()))]
    async fn replace_partition(
        &self,
        scope: Scope,
        period: Period,
        items: &[RankedItem],
    ) -> Result<ReplaceSummary> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = Self::replace_in_tx(&mut tx, scope, period, items).await;
        let summary = tx.commit_or_rollback(result).await?;

        debug!(
            deleted = summary.deleted,
            written = summary.written,
            "Partition replaced"
        );
        Ok(summary)
    }

    #[instrument(skip(self), fields(scope = %scope, period = %period))]
    async fn top(
        &self,
        scope: Scope,
        period: Period,
        limit: Option<usize>,
    ) -> Result<Vec<RankEntry>> {
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        let rows = sqlx::query(
            r#"
            SELECT post_id, rank
            FROM top_posts
            WHERE scope_kind = $1 AND scope_id = $2 AND period = $3
            ORDER BY rank ASC
            LIMIT $4
            "#,
        )
        .bind(scope.kind().as_str())
        .bind(scope.scope_key())
        .bind(period.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| -> Result<RankEntry> {
                let rank: i32 = row.try_get("rank")?;
                Ok(RankEntry {
                    scope,
                    period,
                    content_id: ContentId::new(row.try_get("post_id")?),
                    rank: u32::try_from(rank)
                        .map_err(|_| Error::InvalidData(format!("negative rank {}", rank)))?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(kind = kind.as_str(), period = %period))]
    async fn partitions(&self, kind: ScopeKind, period: Period) -> Result<Vec<Scope>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT scope_kind, scope_id
            FROM top_posts
            WHERE scope_kind = $1 AND period = $2
            ORDER BY scope_id
            "#,
        )
        .bind(kind.as_str())
        .bind(period.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| -> Result<Scope> {
                let stored: String = row.try_get("scope_kind")?;
                let kind: ScopeKind = stored
                    .parse()
                    .map_err(|_| Error::InvalidData(format!("scope_kind = '{}'", stored)))?;
                Ok(Scope::from_parts(kind, row.try_get("scope_id")?))
            })
            .collect()
    }
}
