//! Engagement event reads.
//!
//! Views, comments and likes live in three tables owned by the content layer,
//! all keyed by `post_id` and carrying `user_id`, the denormalized
//! `category_id` / `sub_category_id` and `created_at`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

use doodling_domain::{
    CategoryId, ContentId, EngagementEvent, EngagementKind, Scope, SubCategoryId, TimeWindow,
    UserId,
};

use crate::{Error, Result};

/// Read access to engagement events.
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// View events inside `window` that match `scope`, newest first, at most
    /// `limit` of them.
    async fn recent_views(
        &self,
        scope: Scope,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<EngagementEvent>>;

    /// Per-item number of events of `kind` for the given items, over all time.
    ///
    /// Items without any event are omitted from the result.
    async fn count_for_content(
        &self,
        kind: EngagementKind,
        content_ids: &[ContentId],
    ) -> Result<Vec<(ContentId, u64)>>;
}

/// Table holding events of a kind
fn table_for(kind: EngagementKind) -> &'static str {
    match kind {
        EngagementKind::View => "post_views",
        EngagementKind::Comment => "comments",
        EngagementKind::Like => "post_likes",
    }
}

/// PostgreSQL implementation of EngagementRepository.
pub struct PgEngagementRepository {
    pool: PgPool,
}

impl PgEngagementRepository {
    /// Create a new repository over the pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EngagementRepository for PgEngagementRepository {
    #[instrument(skip(self), fields(scope = %scope, window = %window))]
    async fn recent_views(
        &self,
        scope: Scope,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<EngagementEvent>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r#"
            SELECT post_id, user_id, category_id, sub_category_id, created_at
            FROM post_views
            WHERE created_at >= $1
              AND created_at <= $2
              AND ($3::BIGINT IS NULL OR category_id = $3)
              AND ($4::BIGINT IS NULL OR sub_category_id = $4)
            ORDER BY created_at DESC
            LIMIT $5
            "#,
        )
        .bind(window.start())
        .bind(window.end())
        .bind(scope.category_filter().map(CategoryId::get))
        .bind(scope.sub_category_filter().map(SubCategoryId::get))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            views.push(EngagementEvent {
                kind: EngagementKind::View,
                content_id: ContentId::new(row.try_get("post_id")?),
                actor_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
                created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
                category_id: row
                    .try_get::<Option<i64>, _>("category_id")?
                    .map(CategoryId::new),
                sub_category_id: row
                    .try_get::<Option<i64>, _>("sub_category_id")?
                    .map(SubCategoryId::new),
            });
        }

        debug!(views = views.len(), "Fetched views");
        Ok(views)
    }

    #[instrument(skip(self, content_ids), fields(kind = %kind, items = content_ids.len()))]
    async fn count_for_content(
        &self,
        kind: EngagementKind,
        content_ids: &[ContentId],
    ) -> Result<Vec<(ContentId, u64)>> {
        if content_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = content_ids.iter().map(|id| id.get()).collect();
        let sql = format!(
            "SELECT post_id, COUNT(*) AS signals FROM {} WHERE post_id = ANY($1) GROUP BY post_id",
            table_for(kind)
        );

        let rows = sqlx::query(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| {
                let content_id = ContentId::new(row.try_get("post_id")?);
                let signals: i64 = row.try_get("signals")?;
                Ok((content_id, signals.max(0) as u64))
            })
            .collect()
    }
}
