//! In-memory implementations of the repository seams.
//!
//! Provides stores for testing the ranking engine without a database, plus
//! wrappers that inject failures and latency into any other store.

use async_trait::async_trait;
use doodling_domain::{
    CategoryId, ContentId, EngagementEvent, EngagementKind, Period, RankEntry, RankedItem, Scope,
    ScopeKind, SubCategoryId, TimeWindow,
};
use doodling_infrastructure::{
    EngagementRepository, Error, LeaderboardRepository, ReplaceSummary, Result, ScopeCatalog,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory engagement event store and category catalog
#[derive(Default)]
pub struct InMemoryEngagementStore {
    events: Arc<RwLock<Vec<EngagementEvent>>>,
    categories: RwLock<Vec<CategoryId>>,
    sub_categories: RwLock<Vec<SubCategoryId>>,
    view_queries: AtomicUsize,
}

impl InMemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with events
    pub fn with_events(events: impl IntoIterator<Item = EngagementEvent>) -> Self {
        let store = Self::new();
        store.extend(events);
        store
    }

    pub fn insert(&self, event: EngagementEvent) {
        self.events.write().push(event);
    }

    pub fn extend(&self, events: impl IntoIterator<Item = EngagementEvent>) {
        self.events.write().extend(events);
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    pub fn set_categories(&self, ids: impl IntoIterator<Item = i64>) {
        *self.categories.write() = ids.into_iter().map(CategoryId::new).collect();
    }

    pub fn set_sub_categories(&self, ids: impl IntoIterator<Item = i64>) {
        *self.sub_categories.write() = ids.into_iter().map(SubCategoryId::new).collect();
    }

    /// Number of `recent_views` calls served so far
    pub fn view_queries(&self) -> usize {
        self.view_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngagementRepository for InMemoryEngagementStore {
    async fn recent_views(
        &self,
        scope: Scope,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<EngagementEvent>> {
        self.view_queries.fetch_add(1, Ordering::SeqCst);

        let mut views: Vec<EngagementEvent> = self
            .events
            .read()
            .iter()
            .filter(|e| e.kind == EngagementKind::View)
            .filter(|e| window.contains(e.created_at) && scope.matches(e))
            .cloned()
            .collect();

        // newest first; the stable sort keeps insertion order among equal timestamps
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        views.truncate(limit);
        Ok(views)
    }

    async fn count_for_content(
        &self,
        kind: EngagementKind,
        content_ids: &[ContentId],
    ) -> Result<Vec<(ContentId, u64)>> {
        let wanted: HashSet<ContentId> = content_ids.iter().copied().collect();
        let mut counts: HashMap<ContentId, u64> = HashMap::new();

        for event in self.events.read().iter() {
            if event.kind == kind && wanted.contains(&event.content_id) {
                *counts.entry(event.content_id).or_default() += 1;
            }
        }

        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by_key(|(id, _)| *id);
        Ok(counts)
    }
}

#[async_trait]
impl ScopeCatalog for InMemoryEngagementStore {
    async fn category_ids(&self) -> Result<Vec<CategoryId>> {
        let mut ids = self.categories.read().clone();
        ids.sort();
        Ok(ids)
    }

    async fn sub_category_ids(&self) -> Result<Vec<SubCategoryId>> {
        let mut ids = self.sub_categories.read().clone();
        ids.sort();
        Ok(ids)
    }
}

/// In-memory leaderboard; each partition replace happens under one write lock
#[derive(Default)]
pub struct InMemoryLeaderboard {
    partitions: RwLock<HashMap<(Scope, Period), Vec<RankedItem>>>,
    replace_calls: AtomicUsize,
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a snapshot in place without counting it as a replace
    pub fn seed(&self, scope: Scope, period: Period, items: Vec<RankedItem>) {
        self.partitions.write().insert((scope, period), items);
    }

    /// Current snapshot of a partition, in rank order
    pub fn entries(&self, scope: Scope, period: Period) -> Vec<RankedItem> {
        self.partitions
            .read()
            .get(&(scope, period))
            .cloned()
            .unwrap_or_default()
    }

    /// Content ids of a partition, in rank order
    pub fn content_ids(&self, scope: Scope, period: Period) -> Vec<ContentId> {
        self.entries(scope, period)
            .into_iter()
            .map(|item| item.content_id)
            .collect()
    }

    /// Partitions that currently hold at least one row
    pub fn partition_count(&self) -> usize {
        self.partitions
            .read()
            .values()
            .filter(|items| !items.is_empty())
            .count()
    }

    /// Number of `replace_partition` calls served so far
    pub fn replace_count(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeaderboardRepository for InMemoryLeaderboard {
    async fn replace_partition(
        &self,
        scope: Scope,
        period: Period,
        items: &[RankedItem],
    ) -> Result<ReplaceSummary> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);

        let mut sorted = items.to_vec();
        sorted.sort_by_key(|item| item.rank);
        let previous = self.partitions.write().insert((scope, period), sorted);

        Ok(ReplaceSummary {
            deleted: previous.map(|p| p.len() as u64).unwrap_or(0),
            written: items.len() as u64,
        })
    }

    async fn top(
        &self,
        scope: Scope,
        period: Period,
        limit: Option<usize>,
    ) -> Result<Vec<RankEntry>> {
        let entries = self
            .entries(scope, period)
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|item| RankEntry::from_item(scope, period, item))
            .collect();
        Ok(entries)
    }

    async fn partitions(&self, kind: ScopeKind, period: Period) -> Result<Vec<Scope>> {
        let mut scopes: Vec<Scope> = self
            .partitions
            .read()
            .iter()
            .filter(|((scope, p), items)| scope.kind() == kind && *p == period && !items.is_empty())
            .map(|((scope, _), _)| *scope)
            .collect();
        scopes.sort_by_key(|scope| scope.scope_key());
        Ok(scopes)
    }
}

/// Wrapper that fails calls on demand and delegates the rest
pub struct FailingStore<S> {
    inner: S,
    fail_all: AtomicBool,
    fail_writes: AtomicBool,
    failing_scopes: RwLock<HashSet<Scope>>,
}

impl<S> FailingStore<S> {
    /// Wrapper that passes everything through until told otherwise
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_all: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            failing_scopes: RwLock::new(HashSet::new()),
        }
    }

    /// Wrapper that fails every call
    pub fn always(inner: S) -> Self {
        let store = Self::new(inner);
        store.set_fail_all(true);
        store
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Fail only leaderboard writes
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail view reads and partition replaces for one scope
    pub fn fail_scope(&self, scope: Scope) {
        self.failing_scopes.write().insert(scope);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, scope: Option<Scope>) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(Error::Connection("injected failure".to_string()));
        }
        if let Some(scope) = scope {
            if self.failing_scopes.read().contains(&scope) {
                return Err(Error::Connection(format!("injected failure for {}", scope)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S: EngagementRepository> EngagementRepository for FailingStore<S> {
    async fn recent_views(
        &self,
        scope: Scope,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<EngagementEvent>> {
        self.check(Some(scope))?;
        self.inner.recent_views(scope, window, limit).await
    }

    async fn count_for_content(
        &self,
        kind: EngagementKind,
        content_ids: &[ContentId],
    ) -> Result<Vec<(ContentId, u64)>> {
        self.check(None)?;
        self.inner.count_for_content(kind, content_ids).await
    }
}

#[async_trait]
impl<S: LeaderboardRepository> LeaderboardRepository for FailingStore<S> {
    async fn replace_partition(
        &self,
        scope: Scope,
        period: Period,
        items: &[RankedItem],
    ) -> Result<ReplaceSummary> {
        self.check(Some(scope))?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Connection("injected write failure".to_string()));
        }
        self.inner.replace_partition(scope, period, items).await
    }

    async fn top(
        &self,
        scope: Scope,
        period: Period,
        limit: Option<usize>,
    ) -> Result<Vec<RankEntry>> {
        self.check(None)?;
        self.inner.top(scope, period, limit).await
    }

    async fn partitions(&self, kind: ScopeKind, period: Period) -> Result<Vec<Scope>> {
        self.check(None)?;
        self.inner.partitions(kind, period).await
    }
}

#[async_trait]
impl<S: ScopeCatalog> ScopeCatalog for FailingStore<S> {
    async fn category_ids(&self) -> Result<Vec<CategoryId>> {
        self.check(None)?;
        self.inner.category_ids().await
    }

    async fn sub_category_ids(&self) -> Result<Vec<SubCategoryId>> {
        self.check(None)?;
        self.inner.sub_category_ids().await
    }
}

/// Wrapper that sleeps before every view read and partition replace
///
/// Also tracks how many reads are in flight at once, which lets scheduler
/// tests assert that runs of one job never overlap.
pub struct SlowStore<S> {
    inner: S,
    delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl<S> SlowStore<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Highest number of concurrent view reads observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: EngagementRepository> EngagementRepository for SlowStore<S> {
    async fn recent_views(
        &self,
        scope: Scope,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<EngagementEvent>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        tokio::time::sleep(self.delay).await;
        self.inner.recent_views(scope, window, limit).await
    }

    async fn count_for_content(
        &self,
        kind: EngagementKind,
        content_ids: &[ContentId],
    ) -> Result<Vec<(ContentId, u64)>> {
        self.inner.count_for_content(kind, content_ids).await
    }
}

#[async_trait]
impl<S: LeaderboardRepository> LeaderboardRepository for SlowStore<S> {
    async fn replace_partition(
        &self,
        scope: Scope,
        period: Period,
        items: &[RankedItem],
    ) -> Result<ReplaceSummary> {
        tokio::time::sleep(self.delay).await;
        self.inner.replace_partition(scope, period, items).await
    }

    async fn top(
        &self,
        scope: Scope,
        period: Period,
        limit: Option<usize>,
    ) -> Result<Vec<RankEntry>> {
        self.inner.top(scope, period, limit).await
    }

    async fn partitions(&self, kind: ScopeKind, period: Period) -> Result<Vec<Scope>> {
        self.inner.partitions(kind, period).await
    }
}

#[async_trait]
impl<S: ScopeCatalog> ScopeCatalog for SlowStore<S> {
    async fn category_ids(&self) -> Result<Vec<CategoryId>> {
        self.inner.category_ids().await
    }

    async fn sub_category_ids(&self) -> Result<Vec<SubCategoryId>> {
        self.inner.sub_category_ids().await
    }
}
