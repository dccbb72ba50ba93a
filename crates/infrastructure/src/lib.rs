//! Infrastructure layer for the Doodling trending engine
//!
//! This crate provides:
//! - Database access (PostgreSQL with sqlx)
//! - The repository seams the ranking engine reads from and writes to:
//!   engagement events, the leaderboard table and the category catalog
//!
//! ## Architecture
//!
//! The content-management layer owns every table touched here. The ranking
//! engine reads a time-bounded slice of engagement events and replaces one
//! leaderboard partition per run. Repository traits keep the engine
//! independent of PostgreSQL so tests can run against in-memory stores.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use doodling_infrastructure::{DatabaseConfig, DatabasePool, PgLeaderboardRepository};
//!
//! let db_config = DatabaseConfig {
//!     url: "postgres://localhost/doodling".to_string(),
//!     ..DatabaseConfig::default()
//! };
//! let pool = DatabasePool::new(&db_config).await?;
//! assert!(pool.health_check().await.healthy);
//! let leaderboard = PgLeaderboardRepository::new(pool.pool().clone());
//! ```

pub mod database;
pub mod repositories;

pub use database::{DatabaseConfig, DatabasePool, HealthStatus, PoolStats, TransactionExt};
pub use repositories::{
    EngagementRepository, LeaderboardRepository, PgEngagementRepository,
    PgLeaderboardRepository, PgScopeCatalog, ReplaceSummary, ScopeCatalog,
};

/// Infrastructure result type
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure-level errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database errors from sqlx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted value could not be mapped to a domain value
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Timeout errors
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Check if the error is transient, i.e. the next scheduled run may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Connection(_) | Error::Timeout(_)
        )
    }
}
