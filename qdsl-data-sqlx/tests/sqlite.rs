mod common;

use qdsl_data::prelude::*;
use qdsl_data::projection::Materialization;
use qdsl_data::query::DeleteQuery;
use qdsl_data::{DataConfig, Dialect};
use qdsl_test::fixtures;

fn usernames(dtos: &[MemberTeamDto]) -> Vec<&str> {
    dtos.iter().filter_map(|d| d.username.as_deref()).collect()
}

#[tokio::test]
async fn test_search_with_condition() {
    let repo = common::repository().await;
    let condition = SearchCondition::new().age_goe(15).age_loe(23).team_name("teamA");
    let found = repo.search(&condition).await.unwrap();
    assert_eq!(usernames(&found), vec!["member1"]);
    assert_eq!(found[0].team_id, Some(1));
}

#[tokio::test]
async fn test_left_join_keeps_member_without_team() {
    let sessions = common::seeded_sessions().await;
    let mut session = sessions.acquire().await.unwrap();
    session.insert_all(&[fixtures::loner()]).await.unwrap();
    session.release(true).await.unwrap();

    let repo = MemberRepository::new(sessions);
    let all = repo.search(&SearchCondition::new()).await.unwrap();
    assert_eq!(all.len(), 5);
    let loner = all.iter().find(|d| d.member_id == 5).unwrap();
    assert_eq!((loner.team_id, loner.team_name.clone()), (None, None));
}

#[tokio::test]
async fn test_paging_strategies_agree() {
    let repo = common::repository().await;
    for (page, size) in [(0, 3), (1, 3), (0, 2), (1, 2), (3, 2), (0, 10)] {
        let pageable = Pageable::of(page, size).with_sort("username,desc");
        let simple = repo
            .search_page_simple(&SearchCondition::new(), &pageable)
            .await
            .unwrap();
        let complex = repo
            .search_page_complex(&SearchCondition::new(), &pageable)
            .await
            .unwrap();
        assert_eq!(simple, complex, "page {page} size {size}");
        assert_eq!(simple.total_elements, 4);
    }
}

#[tokio::test]
async fn test_username_desc_page() {
    let repo = common::repository().await;
    let page = repo
        .search_page_simple(&SearchCondition::new(), &Pageable::of(0, 2).with_sort("username,desc"))
        .await
        .unwrap();
    assert_eq!(usernames(&page.content), vec!["member4", "member3"]);
    assert_eq!(page.total_pages, 2);
}

#[tokio::test]
async fn test_materialization_strategies_agree() {
    let sessions = common::seeded_sessions().await;
    let mut results = Vec::new();
    for strategy in [
        Materialization::Fields,
        Materialization::Setters,
        Materialization::Constructor,
    ] {
        let repo = MemberRepository::new(sessions.clone()).with_materialization(strategy);
        let mut found = repo.search(&SearchCondition::new().team_name("teamB")).await.unwrap();
        found.sort_by_key(|d| d.member_id);
        results.push(found);
    }
    assert_eq!(usernames(&results[0]), vec!["member3", "member4"]);
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], results[2]);
}

#[tokio::test]
async fn test_team_age_stats() {
    let repo = common::repository().await;
    let stats = repo.team_age_stats().await.unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].team_name, "teamA");
    assert_eq!(stats[0].avg_age, 23.0);
    assert_eq!(stats[1].member_count, 2);
    assert_eq!(stats[1].max_age, 24);
}

#[tokio::test]
async fn test_bulk_statements() {
    let repo = common::repository().await;
    assert_eq!(repo.rename_where_age_lt(24, "non-member").await.unwrap(), 1);
    assert_eq!(repo.add_age(1).await.unwrap(), 4);
    assert_eq!(repo.delete_where_age_gt(25).await.unwrap(), 1);

    let left = repo.find_all().await.unwrap();
    assert_eq!(
        left.iter().map(|m| (m.username.as_deref(), m.age)).collect::<Vec<_>>(),
        vec![(Some("non-member"), 22), (Some("member3"), 25), (Some("member4"), 25)]
    );
}

#[tokio::test]
async fn test_rollback_on_release_false() {
    let sessions = common::seeded_sessions().await;
    let mut session = sessions.acquire().await.unwrap();
    let deleted = session
        .execute(&DeleteQuery::new(member::TABLE).into())
        .await
        .unwrap();
    assert_eq!(deleted, 4);
    session.release(false).await.unwrap();

    let repo = MemberRepository::new(sessions);
    assert_eq!(repo.find_all().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_get_by_username() {
    let repo = common::repository().await;
    assert_eq!(repo.get_by_username("member4").await.unwrap().age, 24);
    assert!(matches!(
        repo.get_by_username("nobody").await,
        Err(DataError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_offset_beyond_signed_range_is_invalid_page() {
    let repo = common::repository().await;
    let pageable = Pageable::of(u64::MAX / 2, 2);
    assert!(matches!(
        repo.search_page_simple(&SearchCondition::new(), &pageable).await,
        Err(DataError::InvalidPage(_))
    ));
    assert!(matches!(
        repo.search_page_complex(&SearchCondition::new(), &pageable).await,
        Err(DataError::InvalidPage(_))
    ));
}

#[tokio::test]
async fn test_connect_rejects_foreign_dialect() {
    let config = DataConfig {
        dialect: Dialect::Postgres,
        ..DataConfig::default()
    };
    assert!(matches!(
        qdsl_data_sqlx::connect(&config).await,
        Err(DataError::Other(_))
    ));
}

#[tokio::test]
async fn test_configured_default_page() {
    let config = DataConfig {
        default_page_size: 3,
        ..DataConfig::default()
    };
    let repo = MemberRepository::from_config(common::seeded_sessions().await, &config);
    let page = repo
        .search_page_complex(&SearchCondition::new(), &repo.default_pageable())
        .await
        .unwrap();
    assert_eq!(page.content.len(), 3);
    assert_eq!(page.total_pages, 2);
}

#[tokio::test]
async fn test_subqueries() {
    let repo = common::repository().await;

    let found = repo.find_age_at_least_average().await.unwrap();
    assert_eq!(
        found.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![2, 3, 4]
    );

    let averaged = repo.usernames_with_average_age().await.unwrap();
    assert_eq!(averaged.len(), 4);
    assert!(averaged.iter().all(|(_, avg)| *avg == 23.5));

    let users = repo.user_dtos_with_oldest_age().await.unwrap();
    assert_eq!(users[3].name.as_deref(), Some("member4"));
    assert!(users.iter().all(|u| u.age == 25));
}

#[tokio::test]
async fn test_case_projections() {
    let sessions = common::seeded_sessions().await;
    let mut session = sessions.acquire().await.unwrap();
    session.insert_all(&[fixtures::loner()]).await.unwrap();
    session.release(true).await.unwrap();
    let repo = MemberRepository::new(sessions);

    assert_eq!(
        repo.age_labels().await.unwrap(),
        vec!["other", "other", "twenty-four", "twenty-four", "other"]
    );
    let bands: Vec<_> = repo
        .age_bands()
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.band)
        .collect();
    assert_eq!(bands, vec!["21~30", "21~30", "21~30", "21~30", "other"]);
}
