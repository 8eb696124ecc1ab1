//! Seam to the query execution engine.
//!
//! The library composes queries; an engine runs them. One [`SessionFactory::acquire`]
//! per repository operation yields a session that executes every query of that
//! operation and is then [released](QueryExecutor::release): committed on
//! success, rolled back otherwise.
//!
//! Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.

use std::future::Future;

use serde::Serialize;

use crate::error::DataError;
use crate::projection::Row;
use crate::query::{CountQuery, Mutation, SelectQuery};

/// Content plus total, as returned by a combined fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResults<T> {
    pub results: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl<T> QueryResults<T> {
    /// Convert every row, keeping the bounds and total.
    pub fn try_map<U>(
        self,
        f: impl FnMut(T) -> Result<U, DataError>,
    ) -> Result<QueryResults<U>, DataError> {
        Ok(QueryResults {
            results: self.results.into_iter().map(f).collect::<Result<_, _>>()?,
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        })
    }
}

/// An acquired session: one connection (and transaction) of the engine.
pub trait QueryExecutor: Send + Sized {
    fn fetch_all(
        &mut self,
        query: &SelectQuery,
    ) -> impl Future<Output = Result<Vec<Row>, DataError>> + Send;

    /// At most one row; more than one is an error.
    fn fetch_optional(
        &mut self,
        query: &SelectQuery,
    ) -> impl Future<Output = Result<Option<Row>, DataError>> + Send {
        async move {
            let mut rows = self.fetch_all(query).await?;
            match rows.len() {
                0 | 1 => Ok(rows.pop()),
                n => Err(DataError::Other(format!("expected at most one row, got {n}"))),
            }
        }
    }

    fn fetch_count(
        &mut self,
        query: &CountQuery,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;

    /// Content and total in one call.
    ///
    /// The default runs the content query and the derived count query one
    /// after the other on this session. Engines that can compute both in a
    /// single round trip override it.
    fn fetch_results(
        &mut self,
        query: &SelectQuery,
    ) -> impl Future<Output = Result<QueryResults<Row>, DataError>> + Send {
        async move {
            let results = self.fetch_all(query).await?;
            let total = self.fetch_count(&query.to_count_query()).await?;
            Ok(QueryResults {
                results,
                total,
                offset: query.offset_value().unwrap_or(0),
                limit: query.limit_value(),
            })
        }
    }

    /// Run an `UPDATE`/`DELETE`, returning the affected row count.
    fn execute(
        &mut self,
        mutation: &Mutation,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;

    /// End the session. `success` commits, otherwise the work is discarded.
    fn release(self, success: bool) -> impl Future<Output = Result<(), DataError>> + Send;
}

/// Hands out sessions.
pub trait SessionFactory: Send + Sync {
    type Session: QueryExecutor;

    fn acquire(&self) -> impl Future<Output = Result<Self::Session, DataError>> + Send;
}
