//! Error types for the trending domain.

use chrono::{DateTime, Utc};

/// Errors raised while constructing or parsing domain values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Scope string is not `global`, `category:<id>` or `subcategory:<id>`
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Period string is not one of the known periods
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Window start lies after its end
    #[error("Invalid window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
