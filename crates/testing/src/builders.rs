//! Fluent builder for engagement scenarios.

use chrono::{DateTime, Duration, Utc};
use doodling_domain::{
    CategoryId, ContentId, EngagementEvent, EngagementKind, SubCategoryId,
};

use crate::fixtures::base_time;
use crate::mocks::InMemoryEngagementStore;

/// Builder for a set of engagement events
///
/// Events are spaced one second apart from the current cursor, so the
/// order of builder calls is also the order of timestamps.
#[derive(Clone)]
pub struct ScenarioBuilder {
    events: Vec<EngagementEvent>,
    cursor: DateTime<Utc>,
    category: Option<CategoryId>,
    sub_category: Option<SubCategoryId>,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            cursor: base_time(),
            category: None,
            sub_category: None,
        }
    }

    /// Move the cursor to `secs` seconds after the fixture base time
    pub fn at(mut self, secs: i64) -> Self {
        self.cursor = base_time() + Duration::seconds(secs);
        self
    }

    /// Tag following events with a category, clearing the subcategory
    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category = Some(CategoryId::new(category_id));
        self.sub_category = None;
        self
    }

    /// Tag following events with a subcategory
    pub fn in_sub_category(mut self, sub_category_id: i64) -> Self {
        self.sub_category = Some(SubCategoryId::new(sub_category_id));
        self
    }

    /// Drop category tags for following events
    pub fn uncategorized(mut self) -> Self {
        self.category = None;
        self.sub_category = None;
        self
    }

    pub fn views(self, content_id: i64, count: usize) -> Self {
        self.push(EngagementKind::View, content_id, count)
    }

    pub fn comments(self, content_id: i64, count: usize) -> Self {
        self.push(EngagementKind::Comment, content_id, count)
    }

    pub fn likes(self, content_id: i64, count: usize) -> Self {
        self.push(EngagementKind::Like, content_id, count)
    }

    fn push(mut self, kind: EngagementKind, content_id: i64, count: usize) -> Self {
        for _ in 0..count {
            let mut event = EngagementEvent::new(kind, ContentId::new(content_id), self.cursor);
            event.category_id = self.category;
            event.sub_category_id = self.sub_category;
            self.events.push(event);
            self.cursor += Duration::seconds(1);
        }
        self
    }

    /// Timestamp the next event would get
    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }

    pub fn build(self) -> Vec<EngagementEvent> {
        self.events
    }

    pub fn into_store(self) -> InMemoryEngagementStore {
        InMemoryEngagementStore::with_events(self.events)
    }
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}
