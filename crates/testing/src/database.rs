//! PostgreSQL test database helpers.
//!
//! Integration tests run against the database named by `TEST_DATABASE_URL`
//! and are `#[ignore]`d by default.

use doodling_domain::EngagementEvent;
use sqlx::{postgres::PgPoolOptions, PgPool};

const TOP_POSTS_SCHEMA: &str = include_str!("../../../migrations/0001_top_posts.sql");
const CONTENT_SCHEMA: &str = include_str!("../sql/content_schema.sql");

/// Test database wrapper
pub struct TestDatabase {
    pool: PgPool,
}

impl TestDatabase {
    /// Connect to `TEST_DATABASE_URL` and make sure the schema exists
    pub async fn from_env() -> anyhow::Result<Self> {
        let url = std::env::var("TEST_DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("TEST_DATABASE_URL not set"))?;
        Self::new_with_url(&url).await
    }

    pub async fn new_with_url(connection_string: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;

        let db = Self { pool };
        db.apply_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn apply_schema(&self) -> anyhow::Result<()> {
        for statement in CONTENT_SCHEMA
            .split(';')
            .chain(TOP_POSTS_SCHEMA.split(';'))
            .map(strip_comments)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Empty every table for test isolation
    pub async fn clean(&self) -> anyhow::Result<()> {
        sqlx::query(
            "TRUNCATE TABLE top_posts, post_views, comments, post_likes, sub_categories, categories",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert events into the table matching their kind
    pub async fn insert_events(&self, events: &[EngagementEvent]) -> anyhow::Result<()> {
        for event in events {
            let table = match event.kind {
                doodling_domain::EngagementKind::View => "post_views",
                doodling_domain::EngagementKind::Comment => "comments",
                doodling_domain::EngagementKind::Like => "post_likes",
            };
            let sql = format!(
                "INSERT INTO {} (post_id, user_id, category_id, sub_category_id, created_at) \
                 VALUES ($1, $2, $3, $4, $5)",
                table
            );
            sqlx::query(&sql)
                .bind(event.content_id.get())
                .bind(event.actor_id.map(|id| id.get()))
                .bind(event.category_id.map(|id| id.get()))
                .bind(event.sub_category_id.map(|id| id.get()))
                .bind(event.created_at)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Register a category, enabled or not
    pub async fn insert_category(&self, id: i64, enabled: bool) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO categories (id, name, enabled) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(format!("category-{}", id))
            .bind(enabled)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn strip_comments(statement: &str) -> String {
    statement
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
