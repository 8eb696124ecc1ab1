//! Member/team DDL and entity seeding.

use qdsl_data::{DataError, Entity};
use sqlx::sqlite::SqlitePool;

use crate::error::SqlxErrorExt;
use crate::session::SqliteSession;

pub const MEMBER_TEAM_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS team (
    team_id INTEGER PRIMARY KEY,
    name    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS member (
    member_id INTEGER PRIMARY KEY,
    username  TEXT,
    age       INTEGER NOT NULL,
    team_id   INTEGER REFERENCES team (team_id)
);
CREATE INDEX IF NOT EXISTS idx_member_team ON member (team_id);
"#;

/// Create the `team` and `member` tables if they do not exist.
pub async fn install_schema(pool: &SqlitePool) -> Result<(), DataError> {
    sqlx::raw_sql(MEMBER_TEAM_SCHEMA)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
    tracing::debug!("member/team schema installed");
    Ok(())
}

/// `INSERT INTO {table} ({columns}) VALUES (?, ...)` for `E`.
fn insert_sql<E: Entity>() -> String {
    let columns = E::columns();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        E::table_name(),
        columns.join(", ")
    )
}

impl SqliteSession {
    /// Insert `entities` inside this session's transaction.
    pub async fn insert_all<E: Entity>(&mut self, entities: &[E]) -> Result<u64, DataError> {
        let sql = insert_sql::<E>();
        let mut inserted = 0;
        for entity in entities {
            let args = crate::session::bind_all(entity.values())?;
            inserted += sqlx::query_with(&sql, args)
                .execute(&mut *self.0)
                .await
                .map_err(SqlxErrorExt::into_data_error)?
                .rows_affected();
        }
        Ok(inserted)
    }
}
