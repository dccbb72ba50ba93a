//! Engagement events read from the content store.
//!
//! Events are owned and persisted by the content-management layer. The ranking
//! engine only ever reads a time-bounded slice of them.

use crate::identifiers::{CategoryId, ContentId, SubCategoryId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of engagement signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    /// A post was opened
    View,
    /// A comment was written on a post
    Comment,
    /// A post was liked
    Like,
}

impl EngagementKind {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Comment => "comment",
            Self::Like => "like",
        }
    }

    /// Signals that only amplify items already surfaced by views
    pub fn amplifiers() -> [EngagementKind; 2] {
        [Self::Comment, Self::Like]
    }
}

impl fmt::Display for EngagementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable engagement event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementEvent {
    /// Signal kind
    pub kind: EngagementKind,
    /// The ranked item
    pub content_id: ContentId,
    /// Who produced the event, if known
    pub actor_id: Option<UserId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Category of the item at event creation
    pub category_id: Option<CategoryId>,
    /// Subcategory of the item at event creation
    pub sub_category_id: Option<SubCategoryId>,
}

impl EngagementEvent {
    /// Create an unscoped event
    pub fn new(kind: EngagementKind, content_id: ContentId, created_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            content_id,
            actor_id: None,
            created_at,
            category_id: None,
            sub_category_id: None,
        }
    }

    /// Attach the acting user
    pub fn with_actor(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Attach the denormalized category
    pub fn in_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Attach the denormalized subcategory
    pub fn in_sub_category(mut self, sub_category_id: SubCategoryId) -> Self {
        self.sub_category_id = Some(sub_category_id);
        self
    }
}
