//! Member search and bulk operations over a [`SessionFactory`].

use std::future::Future;

use crate::condition::SearchCondition;
use crate::config::{DataConfig, DEFAULT_MAX_PAGE_SIZE};
use crate::dto::{MemberAgeBand, MemberTeamDto, TeamAgeStats, UserDto};
use crate::engine::{QueryExecutor, SessionFactory};
use crate::error::DataError;
use crate::expr::{ColumnRef, Expr, OrderSpec};
use crate::model::{member, member_sub, team, Member};
use crate::page::{Page, Pageable, DEFAULT_PAGE_SIZE};
use crate::pagination::page_of;
use crate::predicate::{search_builder, search_predicates};
use crate::projection::{materialize_all, Materialization, Projection};
use crate::query::{DeleteQuery, Mutation, SelectQuery, UpdateQuery};

/// Dynamic member search.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
pub trait MemberSearch: Send + Sync {
    /// Every matching member with its team, unpaged.
    fn search(
        &self,
        condition: &SearchCondition,
    ) -> impl Future<Output = Result<Vec<MemberTeamDto>, DataError>> + Send;

    /// One page; content and total come from a single combined fetch.
    fn search_page_simple(
        &self,
        condition: &SearchCondition,
        pageable: &Pageable,
    ) -> impl Future<Output = Result<Page<MemberTeamDto>, DataError>> + Send;

    /// One page; content and count are separate queries and the count is
    /// skipped when the page alone determines the total.
    fn search_page_complex(
        &self,
        condition: &SearchCondition,
        pageable: &Pageable,
    ) -> impl Future<Output = Result<Page<MemberTeamDto>, DataError>> + Send;
}

/// Run `$body` on a freshly acquired session, then release it: commit when
/// the body returned `Ok`, roll back otherwise. A failed body wins over a
/// failed release.
macro_rules! in_session {
    ($sessions:expr, |$session:ident| $body:block) => {{
        let mut $session = $sessions.acquire().await?;
        let result: Result<_, DataError> = async { $body }.await;
        let released = $session.release(result.is_ok()).await;
        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        }
    }};
}

/// Member queries backed by any engine.
///
/// ```ignore
/// let repo = MemberRepository::new(SqliteSessions::new(pool));
/// let page = repo
///     .search_page_complex(&SearchCondition::new().team_name("teamA"), &Pageable::of(0, 10))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MemberRepository<F> {
    sessions: F,
    materialization: Materialization,
    default_page_size: u64,
    max_page_size: u64,
}

impl<F: SessionFactory> MemberRepository<F> {
    pub fn new(sessions: F) -> Self {
        Self {
            sessions,
            materialization: Materialization::Fields,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn from_config(sessions: F, config: &DataConfig) -> Self {
        Self {
            sessions,
            materialization: config.materialization,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }

    pub fn with_materialization(mut self, materialization: Materialization) -> Self {
        self.materialization = materialization;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: u64) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// First page at the configured default size, for requests that carry
    /// no paging parameters.
    pub fn default_pageable(&self) -> Pageable {
        Pageable::of(0, self.default_page_size)
    }

    pub fn sessions(&self) -> &F {
        &self.sessions
    }

    /// `member m LEFT JOIN team t` projected into [`MemberTeamDto`], filtered
    /// by `condition`; no ordering or bounds.
    pub fn search_query(condition: &SearchCondition) -> SelectQuery {
        Self::joined_query().filter_all(search_predicates(condition))
    }

    /// Same filter as [`search_query`](Self::search_query), built through a
    /// [`BooleanBuilder`](crate::predicate::BooleanBuilder).
    pub fn builder_query(condition: &SearchCondition) -> SelectQuery {
        let query = Self::joined_query();
        match search_builder(condition).into_predicate() {
            Some(predicate) => query.filter(predicate),
            None => query,
        }
    }

    fn joined_query() -> SelectQuery {
        SelectQuery::new(member::TABLE)
            .select(MemberTeamDto::projection())
            .left_join(team::TABLE, member::TEAM_ID.eq_column(team::ID))
    }

    /// The bounded, ordered query for one page.
    ///
    /// Requested sort orders come first; `m.member_id ASC` always closes the
    /// ordering so page boundaries are stable.
    pub fn page_query(
        &self,
        condition: &SearchCondition,
        pageable: &Pageable,
    ) -> Result<SelectQuery, DataError> {
        self.check(condition, pageable)?;
        let mut query = Self::search_query(condition);
        for order in pageable.sort_orders()? {
            let column = sort_column(&order.property)?;
            query = query.order_by(OrderSpec::new(column, order.ascending));
        }
        if !query.is_ordered_by(member::ID.column_ref()) {
            query = query.order_by(member::ID.asc());
        }
        Ok(query.paged(pageable))
    }

    fn check(&self, condition: &SearchCondition, pageable: &Pageable) -> Result<(), DataError> {
        let checked = condition
            .validate()
            .and_then(|_| pageable.validate(self.max_page_size));
        if let Err(e) = &checked {
            tracing::warn!(error = %e, "rejected search request");
        }
        checked
    }

    /// Unpaged search with the filter built in builder style.
    #[tracing::instrument(skip(self))]
    pub async fn search_by_builder(
        &self,
        condition: &SearchCondition,
    ) -> Result<Vec<MemberTeamDto>, DataError> {
        self.fetch_dtos(condition, Self::builder_query(condition)).await
    }

    async fn fetch_dtos(
        &self,
        condition: &SearchCondition,
        query: SelectQuery,
    ) -> Result<Vec<MemberTeamDto>, DataError> {
        if let Err(e) = condition.validate() {
            tracing::warn!(error = %e, "rejected search request");
            return Err(e);
        }
        let strategy = self.materialization;
        in_session!(self.sessions, |session| {
            let rows = session.fetch_all(&query).await?;
            materialize_all(&rows, strategy)
        })
    }

    /// Run any projection query in one session.
    pub async fn fetch<P: Projection>(&self, query: &SelectQuery) -> Result<Vec<P>, DataError> {
        let strategy = self.materialization;
        in_session!(self.sessions, |session| {
            let rows = session.fetch_all(query).await?;
            materialize_all(&rows, strategy)
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<Member>, DataError> {
        let query = SelectQuery::new(member::TABLE)
            .select(Member::projection())
            .order_by(member::ID.asc());
        self.fetch(&query).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<Vec<Member>, DataError> {
        let query = SelectQuery::new(member::TABLE)
            .select(Member::projection())
            .filter(member::USERNAME.eq(username))
            .order_by(member::ID.asc());
        self.fetch(&query).await
    }

    /// Exactly one member, or `NotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_username(&self, username: &str) -> Result<Member, DataError> {
        let query = SelectQuery::new(member::TABLE)
            .select(Member::projection())
            .filter(member::USERNAME.eq(username));
        let strategy = self.materialization;
        in_session!(self.sessions, |session| {
            match session.fetch_optional(&query).await? {
                Some(row) => Member::materialize(&row, strategy),
                None => Err(DataError::NotFound(format!("member `{username}`"))),
            }
        })
    }

    /// Member count, average and oldest age per team, ordered by team name.
    /// Members without a team are not part of any group.
    #[tracing::instrument(skip(self))]
    pub async fn team_age_stats(&self) -> Result<Vec<TeamAgeStats>, DataError> {
        let query = SelectQuery::new(member::TABLE)
            .select(TeamAgeStats::projection())
            .inner_join(team::TABLE, member::TEAM_ID.eq_column(team::ID))
            .group_by(team::NAME)
            .order_by(team::NAME.asc());
        self.fetch(&query).await
    }

    /// Members at least as old as the average member, by id.
    #[tracing::instrument(skip(self))]
    pub async fn find_age_at_least_average(&self) -> Result<Vec<Member>, DataError> {
        let query = SelectQuery::new(member::TABLE)
            .select(Member::projection())
            .filter(member::AGE.goe_query(average_age()))
            .order_by(member::ID.asc());
        self.fetch(&query).await
    }

    /// Every username paired with the overall average age, by id.
    #[tracing::instrument(skip(self))]
    pub async fn usernames_with_average_age(
        &self,
    ) -> Result<Vec<(Option<String>, f64)>, DataError> {
        let query = SelectQuery::new(member::TABLE)
            .select([
                member::USERNAME.select(),
                Expr::subquery(average_age()).as_("avg_age"),
            ])
            .order_by(member::ID.asc());
        in_session!(self.sessions, |session| {
            let rows = session.fetch_all(&query).await?;
            rows.iter()
                .map(|row| -> Result<_, DataError> {
                    Ok((row.get_string("username")?, row.require_f64("avg_age")?))
                })
                .collect::<Result<Vec<_>, _>>()
        })
    }

    /// [`UserDto`]s whose age is the oldest member's age, by id.
    #[tracing::instrument(skip(self))]
    pub async fn user_dtos_with_oldest_age(&self) -> Result<Vec<UserDto>, DataError> {
        let query = SelectQuery::new(member::TABLE)
            .select(UserDto::oldest_age_projection())
            .order_by(member::ID.asc());
        self.fetch(&query).await
    }

    /// `twenty` / `twenty-four` / `other` per member, by id.
    #[tracing::instrument(skip(self))]
    pub async fn age_labels(&self) -> Result<Vec<String>, DataError> {
        let label = member::AGE
            .when(20)
            .then("twenty")
            .when(24)
            .then("twenty-four")
            .otherwise("other");
        let query = SelectQuery::new(member::TABLE)
            .select([label.as_("label")])
            .order_by(member::ID.asc());
        in_session!(self.sessions, |session| {
            let rows = session.fetch_all(&query).await?;
            rows.iter()
                .map(|row| row.require_string("label"))
                .collect::<Result<Vec<_>, _>>()
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn age_bands(&self) -> Result<Vec<MemberAgeBand>, DataError> {
        let query = SelectQuery::new(member::TABLE)
            .select(MemberAgeBand::projection())
            .order_by(member::ID.asc());
        self.fetch(&query).await
    }

    /// `UPDATE member SET username = ? WHERE age < ?`
    #[tracing::instrument(skip(self))]
    pub async fn rename_where_age_lt(&self, age: i32, username: &str) -> Result<u64, DataError> {
        let update = UpdateQuery::new(member::TABLE)
            .set(member::USERNAME, username)
            .filter(member::AGE.lt(age));
        self.execute(update.into()).await
    }

    /// `UPDATE member SET age = age + ?`
    #[tracing::instrument(skip(self))]
    pub async fn add_age(&self, delta: i32) -> Result<u64, DataError> {
        self.execute(UpdateQuery::new(member::TABLE).set_add(member::AGE, delta).into())
            .await
    }

    /// `DELETE FROM member WHERE age > ?`
    #[tracing::instrument(skip(self))]
    pub async fn delete_where_age_gt(&self, age: i32) -> Result<u64, DataError> {
        self.execute(DeleteQuery::new(member::TABLE).filter(member::AGE.gt(age)).into())
            .await
    }

    async fn execute(&self, mutation: Mutation) -> Result<u64, DataError> {
        let affected = in_session!(self.sessions, |session| {
            session.execute(&mutation).await
        })?;
        tracing::info!(table = mutation.table().name, affected, "bulk statement executed");
        Ok(affected)
    }
}

impl<F: SessionFactory> MemberSearch for MemberRepository<F> {
    #[tracing::instrument(skip(self))]
    async fn search(&self, condition: &SearchCondition) -> Result<Vec<MemberTeamDto>, DataError> {
        self.fetch_dtos(condition, Self::search_query(condition)).await
    }

    #[tracing::instrument(skip(self))]
    async fn search_page_simple(
        &self,
        condition: &SearchCondition,
        pageable: &Pageable,
    ) -> Result<Page<MemberTeamDto>, DataError> {
        let query = self.page_query(condition, pageable)?;
        let strategy = self.materialization;
        in_session!(self.sessions, |session| {
            let results = session
                .fetch_results(&query)
                .await?
                .try_map(|row| MemberTeamDto::materialize(&row, strategy))?;
            Ok(Page::new(results.results, pageable, results.total))
        })
    }

    #[tracing::instrument(skip(self))]
    async fn search_page_complex(
        &self,
        condition: &SearchCondition,
        pageable: &Pageable,
    ) -> Result<Page<MemberTeamDto>, DataError> {
        let query = self.page_query(condition, pageable)?;
        let count = query.to_count_query();
        let strategy = self.materialization;
        in_session!(self.sessions, |session| {
            let rows = session.fetch_all(&query).await?;
            let content = materialize_all(&rows, strategy)?;
            page_of(content, pageable, session.fetch_count(&count)).await
        })
    }
}

/// `SELECT AVG(ms.age) FROM member ms`
fn average_age() -> SelectQuery {
    SelectQuery::new(member_sub::TABLE).select([member_sub::AGE.avg()])
}

/// Sortable properties of [`MemberTeamDto`] and the columns behind them.
fn sort_column(property: &str) -> Result<ColumnRef, DataError> {
    match property {
        "id" | "memberId" => Ok(member::ID.column_ref()),
        "username" => Ok(member::USERNAME.column_ref()),
        "age" => Ok(member::AGE.column_ref()),
        "teamId" => Ok(member::TEAM_ID.column_ref()),
        "teamName" => Ok(team::NAME.column_ref()),
        other => Err(DataError::InvalidPage(format!("unknown sort property `{other}`"))),
    }
}
