//! Ranking partitions: the scope an aggregation is bounded by and the period
//! class of its time window.
//!
//! A leaderboard partition is one `(Scope, Period)` pair. Every write of the
//! materializer replaces exactly one partition.

use crate::engagement::EngagementEvent;
use crate::errors::DomainError;
use crate::identifiers::{CategoryId, SubCategoryId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aggregation boundary for a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// Every content item, no filter
    Global,
    /// Items whose denormalized category matches
    Category(CategoryId),
    /// Items whose denormalized subcategory matches
    #[serde(rename = "subcategory")]
    SubCategory(SubCategoryId),
}

/// Scope discriminant, persisted as the `scope_kind` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Global scope
    Global,
    /// Category scope
    Category,
    /// Subcategory scope
    #[serde(rename = "subcategory")]
    SubCategory,
}

impl ScopeKind {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Category => "category",
            Self::SubCategory => "subcategory",
        }
    }
}

impl Scope {
    /// Get the scope discriminant
    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Global => ScopeKind::Global,
            Self::Category(_) => ScopeKind::Category,
            Self::SubCategory(_) => ScopeKind::SubCategory,
        }
    }

    /// Partition key stored next to the kind. Global uses 0, which no
    /// auto-increment key ever takes.
    pub fn scope_key(&self) -> i64 {
        match self {
            Self::Global => 0,
            Self::Category(id) => id.get(),
            Self::SubCategory(id) => id.get(),
        }
    }

    /// Rebuild a scope from its persisted `(kind, key)` pair
    pub fn from_parts(kind: ScopeKind, key: i64) -> Self {
        match kind {
            ScopeKind::Global => Self::Global,
            ScopeKind::Category => Self::Category(CategoryId::new(key)),
            ScopeKind::SubCategory => Self::SubCategory(SubCategoryId::new(key)),
        }
    }

    /// Category filter to apply when reading events, if any
    pub fn category_filter(&self) -> Option<CategoryId> {
        match self {
            Self::Category(id) => Some(*id),
            _ => None,
        }
    }

    /// Subcategory filter to apply when reading events, if any
    pub fn sub_category_filter(&self) -> Option<SubCategoryId> {
        match self {
            Self::SubCategory(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether an event falls inside this scope.
    ///
    /// Events carry their category and subcategory denormalized at creation
    /// time; an event without one never matches a scope that needs it.
    pub fn matches(&self, event: &EngagementEvent) -> bool {
        match self {
            Self::Global => true,
            Self::Category(id) => event.category_id == Some(*id),
            Self::SubCategory(id) => event.sub_category_id == Some(*id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Category(id) => write!(f, "category:{}", id),
            Self::SubCategory(id) => write!(f, "subcategory:{}", id),
        }
    }
}

impl FromStr for Scope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("global") {
            return Ok(Self::Global);
        }

        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| DomainError::InvalidScope(s.to_string()))?;
        let id: i64 = id
            .trim()
            .parse()
            .map_err(|_| DomainError::InvalidScope(s.to_string()))?;

        match kind.trim().to_ascii_lowercase().as_str() {
            "category" => Ok(Self::Category(CategoryId::new(id))),
            "subcategory" | "sub_category" => Ok(Self::SubCategory(SubCategoryId::new(id))),
            _ => Err(DomainError::InvalidScope(s.to_string())),
        }
    }
}

impl FromStr for ScopeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Self::Global),
            "category" => Ok(Self::Category),
            "subcategory" => Ok(Self::SubCategory),
            other => Err(DomainError::InvalidScope(other.to_string())),
        }
    }
}

/// Time-window class of a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// Short window, minutes
    Realtime,
    /// Seven days
    Weekly,
    /// Thirty days
    Monthly,
}

impl Period {
    /// Stable string form, persisted as the `period` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// All periods
    pub fn all() -> [Period; 3] {
        [Self::Realtime, Self::Weekly, Self::Monthly]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realtime" | "real_time" => Ok(Self::Realtime),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(DomainError::InvalidPeriod(s.to_string())),
        }
    }
}
