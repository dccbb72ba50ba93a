//! Integration tests for the PostgreSQL repositories
//!
//! These tests require a PostgreSQL database and are marked with #[ignore] for CI.
//! Run with: TEST_DATABASE_URL=postgres://... cargo test --test repository_tests -- --ignored

use doodling_domain::{
    CategoryId, ContentId, EngagementKind, Period, Scope, ScopeKind, SubCategoryId,
};
use doodling_infrastructure::{
    DatabasePool, EngagementRepository, LeaderboardRepository, PgEngagementRepository,
    PgLeaderboardRepository, PgScopeCatalog, ScopeCatalog,
};
use doodling_testing::{database::TestDatabase, ranked, window_until, ScenarioBuilder};

async fn setup() -> TestDatabase {
    let db = TestDatabase::from_env().await.unwrap();
    db.clean().await.unwrap();
    db
}

#[tokio::test]
#[ignore]
async fn test_recent_views_filters_window_and_scope() {
    let db = setup().await;
    let events = ScenarioBuilder::new()
        .at(10)
        .in_category(5)
        .views(1, 2)
        .in_category(7)
        .views(2, 1)
        .at(900)
        .in_category(5)
        .views(3, 1)
        .build();
    db.insert_events(&events).await.unwrap();

    let repo = PgEngagementRepository::new(db.pool().clone());
    let views = repo
        .recent_views(Scope::Category(CategoryId::new(5)), window_until(600), 100)
        .await
        .unwrap();

    assert_eq!(views.len(), 2);
    assert!(views.iter().all(|v| v.content_id == ContentId::new(1)));
    assert!(views[0].created_at >= views[1].created_at);
}

#[tokio::test]
#[ignore]
async fn test_recent_views_respects_limit() {
    let db = setup().await;
    db.insert_events(&ScenarioBuilder::new().at(1).views(1, 5).build())
        .await
        .unwrap();

    let repo = PgEngagementRepository::new(db.pool().clone());
    let views = repo
        .recent_views(Scope::Global, window_until(600), 3)
        .await
        .unwrap();

    assert_eq!(views.len(), 3);
}

#[tokio::test]
#[ignore]
async fn test_count_for_content_groups_by_item() {
    let db = setup().await;
    let events = ScenarioBuilder::new()
        .comments(1, 3)
        .comments(2, 1)
        .likes(1, 2)
        .build();
    db.insert_events(&events).await.unwrap();

    let repo = PgEngagementRepository::new(db.pool().clone());
    let mut counts = repo
        .count_for_content(
            EngagementKind::Comment,
            &[ContentId::new(1), ContentId::new(2), ContentId::new(3)],
        )
        .await
        .unwrap();
    counts.sort();

    assert_eq!(counts, vec![(ContentId::new(1), 3), (ContentId::new(2), 1)]);
}

#[tokio::test]
#[ignore]
async fn test_replace_partition_swaps_snapshot() {
    let db = setup().await;
    let repo = PgLeaderboardRepository::new(db.pool().clone());

    repo.replace_partition(Scope::Global, Period::Weekly, &ranked(&[1, 2, 3]))
        .await
        .unwrap();
    let summary = repo
        .replace_partition(Scope::Global, Period::Weekly, &ranked(&[4, 1]))
        .await
        .unwrap();

    assert_eq!(summary.deleted, 3);
    assert_eq!(summary.written, 2);

    let top = repo.top(Scope::Global, Period::Weekly, None).await.unwrap();
    let ids: Vec<i64> = top.iter().map(|e| e.content_id.get()).collect();
    assert_eq!(ids, vec![4, 1]);
    assert_eq!(top[0].rank, 1);
}

#[tokio::test]
#[ignore]
async fn test_replace_partition_leaves_other_partitions() {
    let db = setup().await;
    let repo = PgLeaderboardRepository::new(db.pool().clone());
    let category = Scope::Category(CategoryId::new(5));

    repo.replace_partition(category, Period::Realtime, &ranked(&[1, 2]))
        .await
        .unwrap();
    repo.replace_partition(Scope::Global, Period::Realtime, &ranked(&[9]))
        .await
        .unwrap();
    repo.replace_partition(Scope::Global, Period::Realtime, &[])
        .await
        .unwrap();

    assert!(repo
        .top(Scope::Global, Period::Realtime, None)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        repo.top(category, Period::Realtime, Some(1))
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
#[ignore]
async fn test_scope_catalog_lists_enabled_categories() {
    let db = setup().await;
    db.insert_category(7, true).await.unwrap();
    db.insert_category(5, true).await.unwrap();
    db.insert_category(6, false).await.unwrap();

    let catalog = PgScopeCatalog::new(db.pool().clone());
    let ids: Vec<i64> = catalog
        .category_ids()
        .await
        .unwrap()
        .into_iter()
        .map(|id| id.get())
        .collect();

    assert_eq!(ids, vec![5, 7]);
}

#[tokio::test]
#[ignore]
async fn test_partitions_decode_stored_scopes() {
    let db = setup().await;
    let repo = PgLeaderboardRepository::new(db.pool().clone());

    for id in [7, 5] {
        repo.replace_partition(Scope::Category(CategoryId::new(id)), Period::Realtime, &ranked(&[1]))
            .await
            .unwrap();
    }
    repo.replace_partition(Scope::SubCategory(SubCategoryId::new(5)), Period::Realtime, &ranked(&[1]))
        .await
        .unwrap();
    repo.replace_partition(Scope::Category(CategoryId::new(9)), Period::Weekly, &ranked(&[1]))
        .await
        .unwrap();

    let categories = repo
        .partitions(ScopeKind::Category, Period::Realtime)
        .await
        .unwrap();
    assert_eq!(
        categories,
        vec![
            Scope::Category(CategoryId::new(5)),
            Scope::Category(CategoryId::new(7))
        ]
    );

    let sub_categories = repo
        .partitions(ScopeKind::SubCategory, Period::Realtime)
        .await
        .unwrap();
    assert_eq!(sub_categories, vec![Scope::SubCategory(SubCategoryId::new(5))]);
}

#[tokio::test]
#[ignore]
async fn test_pool_health_and_stats() {
    let db = setup().await;
    let pool = DatabasePool::from_pool(db.pool().clone());

    let health = pool.health_check().await;

    assert!(health.healthy);
    assert!(health.error.is_none());
    assert!(pool.stats().size >= 1);
}
