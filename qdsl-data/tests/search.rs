use qdsl_data::prelude::*;
use qdsl_data::projection::Materialization;
use qdsl_test::{fixtures, InMemoryEngine};

fn usernames(dtos: &[MemberTeamDto]) -> Vec<&str> {
    dtos.iter().filter_map(|d| d.username.as_deref()).collect()
}

#[tokio::test]
async fn test_empty_condition_returns_everyone() {
    let engine = InMemoryEngine::with_fixtures();
    engine.insert(&fixtures::loner()).await;
    let repo = MemberRepository::new(engine.clone());

    let all = repo.search(&SearchCondition::new()).await.unwrap();
    assert_eq!(
        usernames(&all),
        vec!["member1", "member2", "member3", "member4", "loner"]
    );
    let loner = all.iter().find(|d| d.member_id == 5).unwrap();
    assert_eq!((loner.team_id, loner.team_name.as_deref()), (None, None));
}

#[tokio::test]
async fn test_blank_filters_are_ignored() {
    let repo = MemberRepository::new(InMemoryEngine::with_fixtures());
    let condition = SearchCondition::new().username("   ").team_name("");
    assert_eq!(repo.search(&condition).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_age_range_and_team() {
    let repo = MemberRepository::new(InMemoryEngine::with_fixtures());
    let condition = SearchCondition::new().age_goe(15).age_loe(23).team_name("teamA");

    let found = repo.search(&condition).await.unwrap();
    assert_eq!(usernames(&found), vec!["member1"]);
    assert_eq!(found[0].team_name.as_deref(), Some("teamA"));

    let by_builder = repo.search_by_builder(&condition).await.unwrap();
    assert_eq!(by_builder, found);
}

#[tokio::test]
async fn test_simple_and_complex_pages_agree() {
    let repo = MemberRepository::new(InMemoryEngine::with_fixtures());
    let conditions = [
        SearchCondition::new(),
        SearchCondition::new().team_name("teamB"),
        SearchCondition::new().age_goe(22),
        SearchCondition::new().username("nobody"),
    ];
    for condition in &conditions {
        for (page, size) in [(0, 1), (0, 3), (1, 3), (1, 2), (5, 2), (0, 20)] {
            let pageable = Pageable::of(page, size).with_sort("age,desc");
            let simple = repo.search_page_simple(condition, &pageable).await.unwrap();
            let complex = repo.search_page_complex(condition, &pageable).await.unwrap();
            assert_eq!(simple.content, complex.content, "{condition:?} {pageable:?}");
            assert_eq!(simple.total_elements, complex.total_elements, "{condition:?} {pageable:?}");
            assert_eq!(simple.total_pages, complex.total_pages);
        }
    }
}

#[tokio::test]
async fn test_username_desc_offset_one_limit_two() {
    let repo = MemberRepository::new(InMemoryEngine::with_fixtures());
    let pageable = Pageable::of(1, 2).with_sort("username,desc");
    // page 1 of size 2 starts at offset 2; offset 1 is not page-aligned, so
    // compose it directly
    let query = MemberRepository::<InMemoryEngine>::search_query(&SearchCondition::new())
        .order_by(member::USERNAME.desc())
        .offset(1)
        .limit(2);
    let dtos: Vec<MemberTeamDto> = repo.fetch(&query).await.unwrap();
    assert_eq!(usernames(&dtos), vec!["member3", "member2"]);

    let page = repo
        .search_page_complex(&SearchCondition::new(), &pageable)
        .await
        .unwrap();
    assert_eq!(usernames(&page.content), vec!["member2", "member1"]);
    assert_eq!(page.total_elements, 4);
}

#[tokio::test]
async fn test_short_first_page_skips_count() {
    let engine = InMemoryEngine::with_fixtures();
    let repo = MemberRepository::new(engine.clone());

    let page = repo
        .search_page_complex(&SearchCondition::new().team_name("teamA"), &Pageable::of(0, 10))
        .await
        .unwrap();
    assert_eq!(page.content.len(), 2);
    assert_eq!(page.total_elements, 2);
    assert_eq!(page.total_pages, 1);

    let calls = engine.calls();
    assert_eq!(calls.fetch_all, 1);
    assert_eq!(calls.fetch_count, 0);
    assert_eq!((calls.acquire, calls.commit), (1, 1));
}

#[tokio::test]
async fn test_short_last_page_skips_count() {
    let engine = InMemoryEngine::with_fixtures();
    let repo = MemberRepository::new(engine.clone());

    let page = repo
        .search_page_complex(&SearchCondition::new(), &Pageable::of(1, 3))
        .await
        .unwrap();
    assert_eq!(page.content.len(), 1);
    assert_eq!(page.total_elements, 4);
    assert_eq!(engine.calls().fetch_count, 0);
}

#[tokio::test]
async fn test_full_page_runs_count() {
    let engine = InMemoryEngine::with_fixtures();
    let repo = MemberRepository::new(engine.clone());

    let page = repo
        .search_page_complex(&SearchCondition::new(), &Pageable::of(0, 2))
        .await
        .unwrap();
    assert_eq!(page.total_elements, 4);
    assert_eq!(page.total_pages, 2);
    assert_eq!(engine.calls().fetch_count, 1);
}

#[tokio::test]
async fn test_page_past_the_end_runs_count() {
    let engine = InMemoryEngine::with_fixtures();
    let repo = MemberRepository::new(engine.clone());

    let page = repo
        .search_page_complex(&SearchCondition::new(), &Pageable::of(9, 2))
        .await
        .unwrap();
    assert!(page.content.is_empty());
    assert_eq!(page.total_elements, 4);
    assert_eq!(engine.calls().fetch_count, 1);
}

#[tokio::test]
async fn test_simple_page_uses_one_combined_fetch() {
    let engine = InMemoryEngine::with_fixtures();
    let repo = MemberRepository::new(engine.clone());

    repo.search_page_simple(&SearchCondition::new(), &Pageable::of(0, 2))
        .await
        .unwrap();
    let calls = engine.calls();
    assert_eq!(calls.fetch_results, 1);
    assert_eq!(calls.fetch_all + calls.fetch_count, 0);
}

#[tokio::test]
async fn test_materialization_strategies_agree() {
    let engine = InMemoryEngine::with_fixtures();
    engine.insert(&fixtures::loner()).await;
    let condition = SearchCondition::new().age_goe(22);
    let mut results = Vec::new();
    for strategy in [
        Materialization::Fields,
        Materialization::Setters,
        Materialization::Constructor,
    ] {
        let repo = MemberRepository::new(engine.clone()).with_materialization(strategy);
        results.push(repo.search(&condition).await.unwrap());
    }
    assert_eq!(results[0].len(), 4);
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], results[2]);
}

#[tokio::test]
async fn test_count_failure_rolls_back() {
    let engine = InMemoryEngine::with_fixtures();
    engine.fail_counts(true);
    let repo = MemberRepository::new(engine.clone());

    let err = repo
        .search_page_complex(&SearchCondition::new(), &Pageable::of(0, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Database(_)));
    let calls = engine.calls();
    assert_eq!((calls.commit, calls.rollback), (0, 1));
}

#[tokio::test]
async fn test_invalid_requests_never_reach_the_engine() {
    let engine = InMemoryEngine::with_fixtures();
    let repo = MemberRepository::new(engine.clone()).with_max_page_size(50);

    let inverted = SearchCondition::new().age_goe(30).age_loe(20);
    assert!(matches!(
        repo.search_page_simple(&inverted, &Pageable::default()).await,
        Err(DataError::InvalidCondition(_))
    ));
    assert!(matches!(
        repo.search_page_simple(&SearchCondition::new(), &Pageable::of(0, 0)).await,
        Err(DataError::InvalidPage(_))
    ));
    assert!(matches!(
        repo.search_page_complex(&SearchCondition::new(), &Pageable::of(0, 51)).await,
        Err(DataError::InvalidPage(_))
    ));
    assert!(matches!(
        repo.search_page_complex(
            &SearchCondition::new(),
            &Pageable::default().with_sort("password,asc")
        )
        .await,
        Err(DataError::InvalidPage(_))
    ));
    assert!(matches!(
        repo.search_page_simple(&SearchCondition::new(), &Pageable::of(u64::MAX / 2, 2))
            .await,
        Err(DataError::InvalidPage(_))
    ));
    assert_eq!(engine.calls().acquire, 0);
}
