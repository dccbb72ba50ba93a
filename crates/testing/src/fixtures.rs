//! Test fixtures for engagement events and ranked items.
//!
//! Times are expressed as seconds after a fixed base instant so scenarios
//! read the same on every run.

use chrono::{DateTime, Duration, TimeZone, Utc};
use doodling_domain::{
    CategoryId, ContentId, EngagementEvent, EngagementKind, RankedItem, SubCategoryId, TimeWindow,
    UserId,
};
use fake::Fake;

/// Fixed reference instant for fixtures
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Instant `secs` seconds after [`base_time`]
pub fn at(secs: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(secs)
}

/// Window from [`base_time`] to `secs` seconds after it
pub fn window_until(secs: i64) -> TimeWindow {
    TimeWindow::new(base_time(), at(secs)).unwrap()
}

pub fn view(content_id: i64, created_at: DateTime<Utc>) -> EngagementEvent {
    EngagementEvent::new(EngagementKind::View, ContentId::new(content_id), created_at)
}

pub fn comment(content_id: i64, created_at: DateTime<Utc>) -> EngagementEvent {
    EngagementEvent::new(EngagementKind::Comment, ContentId::new(content_id), created_at)
}

pub fn like(content_id: i64, created_at: DateTime<Utc>) -> EngagementEvent {
    EngagementEvent::new(EngagementKind::Like, ContentId::new(content_id), created_at)
}

/// View tagged with a category and, optionally, a subcategory
pub fn view_in(
    content_id: i64,
    category_id: i64,
    sub_category_id: Option<i64>,
    created_at: DateTime<Utc>,
) -> EngagementEvent {
    let event = view(content_id, created_at).in_category(CategoryId::new(category_id));
    match sub_category_id {
        Some(id) => event.in_sub_category(SubCategoryId::new(id)),
        None => event,
    }
}

/// `n` events of `kind` for one item, one second apart starting at `from`
pub fn repeated(
    kind: EngagementKind,
    content_id: i64,
    n: usize,
    from: DateTime<Utc>,
) -> Vec<EngagementEvent> {
    (0..n)
        .map(|i| {
            EngagementEvent::new(kind, ContentId::new(content_id), from + Duration::seconds(i as i64))
        })
        .collect()
}

/// Random event of `kind` inside `window`, on one of `items` items
pub fn random_event(kind: EngagementKind, items: i64, window: TimeWindow) -> EngagementEvent {
    let span = window.length().num_seconds().max(1);
    let offset: i64 = (0..=span).fake();
    let content_id: i64 = (1..=items.max(1)).fake();
    let actor: i64 = (1..10_000).fake();
    let category: i64 = (1..=4).fake();

    EngagementEvent::new(
        kind,
        ContentId::new(content_id),
        window.start() + Duration::seconds(offset),
    )
    .with_actor(UserId::new(actor))
    .in_category(CategoryId::new(category))
}

/// Random mix of views, comments and likes inside `window`
pub fn random_events(count: usize, items: i64, window: TimeWindow) -> Vec<EngagementEvent> {
    (0..count)
        .map(|_| {
            let kind = match (0..3).fake::<u8>() {
                0 => EngagementKind::Comment,
                1 => EngagementKind::Like,
                _ => EngagementKind::View,
            };
            random_event(kind, items, window)
        })
        .collect()
}

/// Ranked items for the given ids, ranks 1..n in order
pub fn ranked(content_ids: &[i64]) -> Vec<RankedItem> {
    content_ids
        .iter()
        .enumerate()
        .map(|(i, id)| RankedItem {
            content_id: ContentId::new(*id),
            score: (content_ids.len() - i) as u64,
            rank: i as u32 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_events_stay_inside_window() {
        let window = window_until(600);
        let events = random_events(200, 20, window);

        assert_eq!(events.len(), 200);
        assert!(events.iter().all(|e| window.contains(e.created_at)));
        assert!(events
            .iter()
            .all(|e| (1..=20).contains(&e.content_id.get())));
    }

    #[test]
    fn test_ranked_is_dense() {
        let items = ranked(&[7, 3, 9]);
        assert!(doodling_domain::is_dense(items.iter().map(|i| i.rank)));
        assert_eq!(items[0].content_id, ContentId::new(7));
    }

    #[test]
    fn test_view_in_sets_both_levels() {
        let event = view_in(1, 5, Some(51), at(0));
        assert_eq!(event.category_id, Some(CategoryId::new(5)));
        assert_eq!(event.sub_category_id, Some(SubCategoryId::new(51)));
    }
}
