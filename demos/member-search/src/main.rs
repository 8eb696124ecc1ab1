use qdsl_core::config::QdslConfig;
use qdsl_core::logging::{init_tracing, LogFormat};
use qdsl_data::prelude::*;
use qdsl_data::DataConfig;
use qdsl_data_sqlx::{connect, install_schema, SqliteSessions};
use qdsl_test::fixtures;
use serde::Serialize;

fn print_json<T: Serialize>(label: &str, value: &T) -> Result<(), serde_json::Error> {
    println!("--- {label}\n{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn seed(sessions: &SqliteSessions) -> Result<(), DataError> {
    let mut session = sessions.acquire().await?;
    session.insert_all(&fixtures::teams()).await?;
    session.insert_all(&fixtures::members()).await?;
    session.insert_all(&[fixtures::loner()]).await?;
    session.release(true).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = QdslConfig::load("dev")?.with_typed::<DataConfig>()?;
    init_tracing(LogFormat::from_config(&config)?);
    let data = config.typed().clone();
    tracing::info!(profile = config.profile(), url = %data.url, "starting member search demo");

    let pool = connect(&data).await?;
    install_schema(&pool).await?;
    let sessions = SqliteSessions::new(pool);
    seed(&sessions).await?;
    let repo = MemberRepository::from_config(sessions, &data);

    let condition = SearchCondition::new().age_goe(15).age_loe(23).team_name("teamA");
    print_json("search teamA aged 15..=23", &repo.search(&condition).await?)?;

    let everyone = SearchCondition::new();
    print_json("all members", &repo.search(&everyone).await?)?;

    let pageable = Pageable {
        page: 1,
        ..repo.default_pageable()
    }
    .with_sort("username,desc");
    print_json(
        "page 1, one statement",
        &repo.search_page_simple(&everyone, &pageable).await?,
    )?;
    print_json(
        "page 1, content then count",
        &repo.search_page_complex(&everyone, &pageable).await?,
    )?;

    print_json("team age stats", &repo.team_age_stats().await?)?;
    print_json("at least average age", &repo.find_age_at_least_average().await?)?;
    print_json("username with average age", &repo.usernames_with_average_age().await?)?;
    print_json("age bands", &repo.age_bands().await?)?;

    let renamed = repo.rename_where_age_lt(22, "junior").await?;
    let aged = repo.add_age(1).await?;
    tracing::info!(renamed, aged, "bulk updates applied");
    print_json("after bulk updates", &repo.find_all().await?)?;

    Ok(())
}
