//! SQLite sessions: one pooled transaction per repository operation.

use std::ops::{Deref, DerefMut};

use qdsl_data::expr::{SelectItem, Value, ValueKind, WINDOW_COUNT_LABEL};
use qdsl_data::query::{projection_kinds, CountQuery, Dialect, Mutation, SelectQuery, SqlStatement};
use qdsl_data::{DataError, QueryExecutor, QueryResults, Row, SessionFactory};
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqliteRow};
use sqlx::{Arguments, Decode, Sqlite, Transaction, TypeInfo, ValueRef};

use crate::error::SqlxErrorExt;

/// [`SessionFactory`] over a SQLite pool.
///
/// ```ignore
/// let pool = qdsl_data_sqlx::connect(&config).await?;
/// let repo = MemberRepository::new(SqliteSessions::new(pool));
/// ```
#[derive(Debug, Clone)]
pub struct SqliteSessions {
    pool: SqlitePool,
}

impl SqliteSessions {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SessionFactory for SqliteSessions {
    type Session = SqliteSession;

    async fn acquire(&self) -> Result<SqliteSession, DataError> {
        let tx = self.pool.begin().await.map_err(SqlxErrorExt::into_data_error)?;
        Ok(SqliteSession(tx))
    }
}

/// A SQLx [`Transaction`] driven through [`QueryExecutor`].
///
/// - `release(true)`: commits the transaction
/// - `release(false)` or drop: rolls back
pub struct SqliteSession(pub Transaction<'static, Sqlite>);

impl Deref for SqliteSession {
    type Target = Transaction<'static, Sqlite>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SqliteSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl SqliteSession {
    /// Unwraps the session into the inner `Transaction`.
    pub fn into_inner(self) -> Transaction<'static, Sqlite> {
        self.0
    }
}

pub(crate) fn bind_all<'q>(params: Vec<Value>) -> Result<SqliteArguments<'q>, DataError> {
    let mut args = SqliteArguments::default();
    for param in params {
        let added = match param {
            Value::Int(v) => args.add(v),
            Value::Float(v) => args.add(v),
            Value::Text(v) => args.add(v),
            Value::Null => args.add(None::<i64>),
        };
        added.map_err(DataError::Database)?;
    }
    Ok(args)
}

/// Decode by the stored type, then widen integers where the projection
/// expects a float (SQLite may store `REAL` columns as integers).
fn decode(row: &SqliteRow, idx: usize, expected: ValueKind) -> Result<Value, DataError> {
    use sqlx::Row as _;

    let raw = row.try_get_raw(idx).map_err(SqlxErrorExt::into_data_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let decoded = match type_name.as_str() {
        "INTEGER" => <i64 as Decode<'_, Sqlite>>::decode(raw).map(Value::Int),
        "REAL" => <f64 as Decode<'_, Sqlite>>::decode(raw).map(Value::Float),
        "TEXT" => <String as Decode<'_, Sqlite>>::decode(raw).map(Value::Text),
        other => {
            return Err(DataError::Mapping(format!(
                "column {idx}: unsupported storage class {other}"
            )))
        }
    }
    .map_err(|e| DataError::Mapping(format!("column {idx}: {e}")))?;
    Ok(match (expected, decoded) {
        (ValueKind::Float, Value::Int(i)) => Value::Float(i as f64),
        (_, value) => value,
    })
}

fn log_statement(stmt: &SqlStatement) {
    tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "executing statement");
}

impl QueryExecutor for SqliteSession {
    async fn fetch_all(&mut self, query: &SelectQuery) -> Result<Vec<Row>, DataError> {
        let stmt = query.build_select_for(Dialect::Sqlite)?;
        log_statement(&stmt);
        let kinds = projection_kinds(query);
        let args = bind_all(stmt.params)?;
        let raw_rows = sqlx::query_with(&stmt.sql, args)
            .fetch_all(&mut *self.0)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;

        let mut rows = Vec::with_capacity(raw_rows.len());
        for raw in &raw_rows {
            let mut row = Row::new();
            for (idx, (item, kind)) in query.projection().iter().zip(&kinds).enumerate() {
                row.push(item.label.clone(), decode(raw, idx, *kind)?);
            }
            rows.push(row);
        }
        Ok(rows)
    }

    async fn fetch_count(&mut self, query: &CountQuery) -> Result<u64, DataError> {
        let stmt = query.build_for(Dialect::Sqlite)?;
        log_statement(&stmt);
        let args = bind_all(stmt.params)?;
        let count: i64 = sqlx::query_scalar_with::<_, i64, _>(&stmt.sql, args)
            .fetch_one(&mut *self.0)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        u64::try_from(count).map_err(|_| DataError::Mapping(format!("negative count {count}")))
    }

    /// Content and total in one statement via `COUNT(*) OVER ()`. Only a page
    /// past the end, which carries no rows to read the total from, needs a
    /// second round trip.
    async fn fetch_results(&mut self, query: &SelectQuery) -> Result<QueryResults<Row>, DataError> {
        let windowed = query.clone().select(
            query
                .projection()
                .iter()
                .cloned()
                .chain(std::iter::once(SelectItem::window_count())),
        );
        let mut rows = self.fetch_all(&windowed).await?;
        let offset = query.offset_value().unwrap_or(0);

        let total = match rows.first() {
            Some(first) => {
                let total = first.require_i64(WINDOW_COUNT_LABEL)?;
                u64::try_from(total)
                    .map_err(|_| DataError::Mapping(format!("negative count {total}")))?
            }
            None if offset == 0 => 0,
            None => self.fetch_count(&query.to_count_query()).await?,
        };
        for row in &mut rows {
            row.take(WINDOW_COUNT_LABEL);
        }
        Ok(QueryResults {
            results: rows,
            total,
            offset,
            limit: query.limit_value(),
        })
    }

    async fn execute(&mut self, mutation: &Mutation) -> Result<u64, DataError> {
        let stmt = mutation.build_for(Dialect::Sqlite)?;
        log_statement(&stmt);
        let args = bind_all(stmt.params)?;
        let done = sqlx::query_with(&stmt.sql, args)
            .execute(&mut *self.0)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(done.rows_affected())
    }

    async fn release(self, success: bool) -> Result<(), DataError> {
        if success {
            self.into_inner()
                .commit()
                .await
                .map_err(SqlxErrorExt::into_data_error)?;
        }
        // If !success, the transaction is dropped and automatically rolled back
        Ok(())
    }
}
