//! # qdsl-data-sqlx
//!
//! SQLite execution engine for `qdsl-data`: every repository operation runs
//! in one pooled transaction, queries are rendered in the SQLite dialect and
//! rows are decoded into [`qdsl_data::Row`]s.

pub mod error;
pub mod schema;
pub mod session;

use qdsl_data::query::Dialect;
use qdsl_data::{DataConfig, DataError};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use error::SqlxErrorExt;
pub use schema::{install_schema, MEMBER_TEAM_SCHEMA};
pub use session::{SqliteSession, SqliteSessions};

/// Open a pool for `config.url`.
///
/// An in-memory database exists per connection, so `:memory:` URLs get a
/// single-connection pool regardless of `pool.size`. Queries on this engine
/// are always rendered for SQLite, so any other configured dialect is an error.
pub async fn connect(config: &DataConfig) -> Result<SqlitePool, DataError> {
    if config.dialect != Dialect::Sqlite {
        tracing::error!(dialect = ?config.dialect, "dialect not served by the sqlite engine");
        return Err(DataError::Other(format!(
            "qdsl.data.dialect is {:?}, but this engine only renders SQLite",
            config.dialect
        )));
    }
    let max_connections = if config.url.contains(":memory:") {
        1
    } else {
        config.pool_size
    };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&config.url)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
    tracing::info!(url = %config.url, max_connections, "sqlite pool ready");
    Ok(pool)
}
