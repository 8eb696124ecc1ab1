use qdsl_data::{DataConfig, MemberRepository, QueryExecutor, SessionFactory};
use qdsl_data_sqlx::{connect, install_schema, SqliteSessions};
use qdsl_test::fixtures;

/// Fresh in-memory database with the member/team fixtures committed.
pub async fn seeded_sessions() -> SqliteSessions {
    let pool = connect(&DataConfig::default()).await.unwrap();
    install_schema(&pool).await.unwrap();
    let sessions = SqliteSessions::new(pool);

    let mut session = sessions.acquire().await.unwrap();
    session.insert_all(&fixtures::teams()).await.unwrap();
    session.insert_all(&fixtures::members()).await.unwrap();
    session.release(true).await.unwrap();
    sessions
}

pub async fn repository() -> MemberRepository<SqliteSessions> {
    MemberRepository::new(seeded_sessions().await)
}
