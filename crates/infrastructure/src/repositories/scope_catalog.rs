//! Category catalog reads.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use doodling_domain::{CategoryId, SubCategoryId};

use crate::{Error, Result};

/// Known categories and subcategories eligible for per-scope rankings.
#[async_trait]
pub trait ScopeCatalog: Send + Sync {
    /// Ids of enabled categories, ascending
    async fn category_ids(&self) -> Result<Vec<CategoryId>>;

    /// Ids of enabled subcategories, ascending
    async fn sub_category_ids(&self) -> Result<Vec<SubCategoryId>>;
}

/// PostgreSQL implementation of ScopeCatalog.
pub struct PgScopeCatalog {
    pool: PgPool,
}

impl PgScopeCatalog {
    /// Create a new catalog over the pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScopeCatalog for PgScopeCatalog {
    #[instrument(skip(self))]
    async fn category_ids(&self) -> Result<Vec<CategoryId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM categories WHERE enabled ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(ids.into_iter().map(CategoryId::new).collect())
    }

    #[instrument(skip(self))]
    async fn sub_category_ids(&self) -> Result<Vec<SubCategoryId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM sub_categories WHERE enabled ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(ids.into_iter().map(SubCategoryId::new).collect())
    }
}
