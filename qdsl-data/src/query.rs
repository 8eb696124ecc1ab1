//! Query composition and SQL rendering.
//!
//! A [`SelectQuery`] is a plain value: projection, base table, joins, a list of
//! predicates combined with `AND`, grouping, ordering and bounds. Rendering to
//! SQL happens only when an engine asks for it, in the engine's dialect.
//!
//! # Example
//!
//! ```ignore
//! let q = SelectQuery::new(member::TABLE)
//!     .select(MemberTeamDto::projection())
//!     .left_join(team::TABLE, member::TEAM_ID.eq_column(team::ID))
//!     .filter(team::NAME.eq("teamA"))
//!     .order_by(member::USERNAME.desc())
//!     .limit(10);
//! let stmt = q.build_select()?;
//! ```

use std::str::FromStr;

use crate::expr::{
    AggregateFn, Column, ColumnRef, Expr, NullOrdering, OrderSpec, Predicate, SelectItem, SqlType,
    TableRef, Value, ValueKind,
};
use crate::page::Pageable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// `?` placeholders, double-quoted identifiers.
    #[default]
    Generic,
    Sqlite,
    /// Backtick quoting; `NULLS FIRST/LAST` is emulated.
    MySql,
    /// Numbered `$n` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    fn supports_nulls_ordering(self) -> bool {
        !matches!(self, Dialect::MySql)
    }
}

impl FromStr for Dialect {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(Dialect::Generic),
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(QueryError::UnknownDialect(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Emit table and column names untouched.
    Raw,
    /// Reject names outside `[A-Za-z_][A-Za-z0-9_]*`.
    #[default]
    Validate,
    /// Check as `Validate`, then quote for the dialect.
    Quote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    /// `IN ()` has no valid SQL rendering.
    EmptyInList { column: String },
    EmptyProjection,
    EmptyUpdate { table: String },
    /// `CASE` without a single `WHEN` branch.
    EmptyCase,
    UnknownDialect(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "{kind} name `{ident}` is not a plain identifier")
            }
            QueryError::EmptyInList { column } => write!(f, "Empty IN list for column {column}"),
            QueryError::EmptyProjection => write!(f, "SELECT without projection"),
            QueryError::EmptyUpdate { table } => write!(f, "UPDATE {table} without assignments"),
            QueryError::EmptyCase => write!(f, "CASE without WHEN branches"),
            QueryError::UnknownDialect(name) => write!(f, "Unknown SQL dialect: {name}"),
        }
    }
}

impl std::error::Error for QueryError {}

/// Rendered SQL with its positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Predicate,
}

impl<T> From<Column<T>> for ColumnRef
where
    T: SqlType,
{
    fn from(column: Column<T>) -> Self {
        column.column_ref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    projection: Vec<SelectItem>,
    table: TableRef,
    joins: Vec<Join>,
    predicates: Vec<Predicate>,
    group_by: Vec<ColumnRef>,
    order: Vec<OrderSpec>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

impl SelectQuery {
    pub fn new(table: TableRef) -> Self {
        Self {
            projection: Vec::new(),
            table,
            joins: Vec::new(),
            predicates: Vec::new(),
            group_by: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            dialect: Dialect::Generic,
            identifier_policy: IdentifierPolicy::Validate,
        }
    }

    /// Replace the projection.
    pub fn select(mut self, items: impl IntoIterator<Item = SelectItem>) -> Self {
        self.projection = items.into_iter().collect();
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    pub fn left_join(mut self, table: TableRef, on: Predicate) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            table,
            on,
        });
        self
    }

    pub fn inner_join(mut self, table: TableRef, on: Predicate) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            table,
            on,
        });
        self
    }

    /// Add a predicate to the `AND`-ed where list. A top-level `And` is split
    /// so builder-style and list-style conditions render identically.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.extend(predicate.into_conjuncts());
        self
    }

    /// Add every present predicate, skipping `None`.
    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        for predicate in predicates.into_iter().flatten() {
            self.predicates.extend(predicate.into_conjuncts());
        }
        self
    }

    pub fn group_by(mut self, column: impl Into<ColumnRef>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.order.push(spec);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    /// Bound the query to one page: `OFFSET page * size LIMIT size`.
    ///
    /// This is the only place paged queries get their bounds, which keeps the
    /// limit equal to the page size for the count-skipping strategy.
    pub fn paged(self, pageable: &Pageable) -> Self {
        self.offset(pageable.offset()).limit(pageable.size)
    }

    pub fn projection(&self) -> &[SelectItem] {
        &self.projection
    }

    pub fn table(&self) -> TableRef {
        self.table
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn grouping(&self) -> &[ColumnRef] {
        &self.group_by
    }

    pub fn ordering(&self) -> &[OrderSpec] {
        &self.order
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit_val
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset_val
    }

    /// Whether `column` already takes part in the ordering.
    pub fn is_ordered_by(&self, column: ColumnRef) -> bool {
        self.order.iter().any(|spec| spec.column == column)
    }

    /// Whether this query, used as a subquery, reads columns of an enclosing
    /// query's `alias`. An alias the query binds itself shadows the outer one.
    pub fn references_alias(&self, alias: &str) -> bool {
        if self.table.alias == alias || self.joins.iter().any(|j| j.table.alias == alias) {
            return false;
        }
        self.projection.iter().any(|item| item.expr.references_alias(alias))
            || self.predicates.iter().any(|p| p.references_alias(alias))
            || self.joins.iter().any(|j| j.on.references_alias(alias))
    }

    /// Build the SELECT in the query's own dialect.
    pub fn build_select(&self) -> Result<SqlStatement, QueryError> {
        self.build_select_for(self.dialect)
    }

    /// Build the SELECT in `dialect`, regardless of the configured one.
    pub fn build_select_for(&self, dialect: Dialect) -> Result<SqlStatement, QueryError> {
        let mut r = Renderer::new(dialect, self.identifier_policy, true);
        r.select(self)?;
        Ok(r.finish())
    }

    /// Derive the matching count query.
    ///
    /// Projection, ordering and bounds are dropped. A `LEFT JOIN` that no
    /// predicate, grouping column or other kept join refers to is dropped as
    /// well: joining a to-one relation cannot change the row count.
    pub fn to_count_query(&self) -> CountQuery {
        let mut kept: Vec<Join> = Vec::new();
        for join in self.joins.iter().rev() {
            let alias = join.table.alias;
            let needed = join.kind == JoinKind::Inner
                || self.predicates.iter().any(|p| p.references_alias(alias))
                || self.group_by.iter().any(|c| c.alias == alias)
                || kept.iter().any(|k| k.on.references_alias(alias));
            if needed {
                kept.push(join.clone());
            }
        }
        kept.reverse();
        CountQuery {
            table: self.table,
            joins: kept,
            predicates: self.predicates.clone(),
            group_by: self.group_by.clone(),
            dialect: self.dialect,
            identifier_policy: self.identifier_policy,
        }
    }
}

/// `SELECT COUNT(*)` over the filtered join, derived from a [`SelectQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    table: TableRef,
    joins: Vec<Join>,
    predicates: Vec<Predicate>,
    group_by: Vec<ColumnRef>,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

impl CountQuery {
    pub fn table(&self) -> TableRef {
        self.table
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn grouping(&self) -> &[ColumnRef] {
        &self.group_by
    }

    pub fn build(&self) -> Result<SqlStatement, QueryError> {
        self.build_for(self.dialect)
    }

    pub fn build_for(&self, dialect: Dialect) -> Result<SqlStatement, QueryError> {
        let mut r = Renderer::new(dialect, self.identifier_policy, true);
        if self.group_by.is_empty() {
            r.sql.push_str("SELECT COUNT(*)");
            r.from_and_joins(self.table, &self.joins)?;
            r.where_clause(&self.predicates)?;
        } else {
            r.sql.push_str("SELECT COUNT(*) FROM (SELECT 1");
            r.from_and_joins(self.table, &self.joins)?;
            r.where_clause(&self.predicates)?;
            r.group_by(&self.group_by)?;
            r.sql.push_str(") grouped");
        }
        Ok(r.finish())
    }
}

/// Numeric column types usable in `SET col = col + ?`.
pub trait Numeric: SqlType {}

impl Numeric for i32 {}
impl Numeric for i64 {}
impl Numeric for f64 {}

#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Set(ColumnRef, Value),
    Add(ColumnRef, Value),
}

impl Assignment {
    pub fn column(&self) -> ColumnRef {
        match self {
            Assignment::Set(column, _) | Assignment::Add(column, _) => *column,
        }
    }
}

/// Bulk `UPDATE` over a single table.
///
/// Columns are rendered unqualified since not every dialect accepts a table
/// alias in `UPDATE`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    table: TableRef,
    assignments: Vec<Assignment>,
    predicates: Vec<Predicate>,
    identifier_policy: IdentifierPolicy,
}

impl UpdateQuery {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            predicates: Vec::new(),
            identifier_policy: IdentifierPolicy::Validate,
        }
    }

    pub fn set<T: SqlType>(mut self, column: Column<T>, value: impl Into<T>) -> Self {
        let typed: T = value.into();
        self.assignments
            .push(Assignment::Set(column.column_ref(), typed.into()));
        self
    }

    /// `SET col = col + delta`
    pub fn set_add<T: Numeric>(mut self, column: Column<T>, delta: impl Into<T>) -> Self {
        let typed: T = delta.into();
        self.assignments
            .push(Assignment::Add(column.column_ref(), typed.into()));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.extend(predicate.into_conjuncts());
        self
    }

    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    pub fn table(&self) -> TableRef {
        self.table
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn build_for(&self, dialect: Dialect) -> Result<SqlStatement, QueryError> {
        if self.assignments.is_empty() {
            return Err(QueryError::EmptyUpdate {
                table: self.table.name.to_string(),
            });
        }
        let mut r = Renderer::new(dialect, self.identifier_policy, false);
        let table = r.ident(self.table.name, "table")?;
        r.sql.push_str(&format!("UPDATE {table} SET "));
        let mut sets = Vec::with_capacity(self.assignments.len());
        for assignment in &self.assignments {
            match assignment {
                Assignment::Set(column, value) => {
                    let col = r.column(column)?;
                    let placeholder = r.bind(value.clone());
                    sets.push(format!("{col} = {placeholder}"));
                }
                Assignment::Add(column, delta) => {
                    let col = r.column(column)?;
                    let placeholder = r.bind(delta.clone());
                    sets.push(format!("{col} = {col} + {placeholder}"));
                }
            }
        }
        r.sql.push_str(&sets.join(", "));
        r.where_clause(&self.predicates)?;
        Ok(r.finish())
    }
}

/// Bulk `DELETE` over a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    table: TableRef,
    predicates: Vec<Predicate>,
    identifier_policy: IdentifierPolicy,
}

impl DeleteQuery {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            predicates: Vec::new(),
            identifier_policy: IdentifierPolicy::Validate,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.extend(predicate.into_conjuncts());
        self
    }

    pub fn table(&self) -> TableRef {
        self.table
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn build_for(&self, dialect: Dialect) -> Result<SqlStatement, QueryError> {
        let mut r = Renderer::new(dialect, self.identifier_policy, false);
        let table = r.ident(self.table.name, "table")?;
        r.sql.push_str(&format!("DELETE FROM {table}"));
        r.where_clause(&self.predicates)?;
        Ok(r.finish())
    }
}

/// A data-modifying statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Update(UpdateQuery),
    Delete(DeleteQuery),
}

impl Mutation {
    pub fn build_for(&self, dialect: Dialect) -> Result<SqlStatement, QueryError> {
        match self {
            Mutation::Update(q) => q.build_for(dialect),
            Mutation::Delete(q) => q.build_for(dialect),
        }
    }

    pub fn table(&self) -> TableRef {
        match self {
            Mutation::Update(q) => q.table(),
            Mutation::Delete(q) => q.table(),
        }
    }
}

impl From<UpdateQuery> for Mutation {
    fn from(q: UpdateQuery) -> Self {
        Mutation::Update(q)
    }
}

impl From<DeleteQuery> for Mutation {
    fn from(q: DeleteQuery) -> Self {
        Mutation::Delete(q)
    }
}

struct Renderer {
    dialect: Dialect,
    policy: IdentifierPolicy,
    /// Render columns as `alias.name` (SELECT) or bare `name` (UPDATE/DELETE).
    qualify: bool,
    sql: String,
    params: Vec<Value>,
}

impl Renderer {
    fn new(dialect: Dialect, policy: IdentifierPolicy, qualify: bool) -> Self {
        Self {
            dialect,
            policy,
            qualify,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn finish(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            params: self.params,
        }
    }

    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    fn ident(&self, ident: &str, kind: &'static str) -> Result<String, QueryError> {
        if self.policy != IdentifierPolicy::Raw && !is_valid_segment(ident) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.policy {
            IdentifierPolicy::Quote => {
                let quote = self.dialect.quote_char();
                Ok(format!("{quote}{ident}{quote}"))
            }
            IdentifierPolicy::Raw | IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }

    fn column(&self, column: &ColumnRef) -> Result<String, QueryError> {
        let name = self.ident(column.name, "column")?;
        if self.qualify {
            let alias = self.ident(column.alias, "alias")?;
            Ok(format!("{alias}.{name}"))
        } else {
            Ok(name)
        }
    }

    fn table(&self, table: TableRef) -> Result<String, QueryError> {
        let name = self.ident(table.name, "table")?;
        let alias = self.ident(table.alias, "alias")?;
        Ok(format!("{name} {alias}"))
    }

    /// Full `SELECT`, appended to the statement. Subqueries nest through here
    /// and share the parameter list, so placeholders stay in textual order.
    fn select(&mut self, query: &SelectQuery) -> Result<(), QueryError> {
        if query.projection.is_empty() {
            return Err(QueryError::EmptyProjection);
        }
        self.sql.push_str("SELECT ");
        let mut items = Vec::with_capacity(query.projection.len());
        for item in &query.projection {
            let expr = self.expr(&item.expr)?;
            let label = self.ident(&item.label, "label")?;
            items.push(format!("{expr} AS {label}"));
        }
        self.sql.push_str(&items.join(", "));
        self.from_and_joins(query.table, &query.joins)?;
        self.where_clause(&query.predicates)?;
        self.group_by(&query.group_by)?;
        self.order_by(&query.order)?;
        self.limit_offset(query.limit_val, query.offset_val);
        Ok(())
    }

    /// Run `render` against an empty buffer and return what it wrote.
    fn capture(
        &mut self,
        render: impl FnOnce(&mut Self) -> Result<(), QueryError>,
    ) -> Result<String, QueryError> {
        let outer = std::mem::take(&mut self.sql);
        let result = render(self);
        let inner = std::mem::replace(&mut self.sql, outer);
        result.map(|()| inner)
    }

    /// `(SELECT ...)`; subquery columns are always qualified.
    fn subquery(&mut self, query: &SelectQuery) -> Result<String, QueryError> {
        let qualify = std::mem::replace(&mut self.qualify, true);
        let rendered = self.capture(|r| r.select(query));
        self.qualify = qualify;
        Ok(format!("({})", rendered?))
    }

    fn expr(&mut self, expr: &Expr) -> Result<String, QueryError> {
        match expr {
            Expr::Column(column) => self.column(column),
            Expr::Aggregate(func, column) => {
                let col = self.column(column)?;
                Ok(format!("{}({col})", func.sql()))
            }
            Expr::CountAll => Ok(format!("{}(*)", AggregateFn::Count.sql())),
            Expr::WindowCount => Ok(format!("{}(*) OVER ()", AggregateFn::Count.sql())),
            Expr::Subquery(query) => self.subquery(query),
            Expr::Case(case) => {
                if case.branches.is_empty() {
                    return Err(QueryError::EmptyCase);
                }
                self.capture(|r| {
                    r.sql.push_str("CASE");
                    for (condition, value) in &case.branches {
                        r.sql.push_str(" WHEN ");
                        r.predicate(condition, false)?;
                        let then = r.bind(value.clone());
                        r.sql.push_str(&format!(" THEN {then}"));
                    }
                    let otherwise = r.bind(case.otherwise.clone());
                    r.sql.push_str(&format!(" ELSE {otherwise} END"));
                    Ok(())
                })
            }
        }
    }

    fn from_and_joins(&mut self, table: TableRef, joins: &[Join]) -> Result<(), QueryError> {
        let from = self.table(table)?;
        self.sql.push_str(&format!(" FROM {from}"));
        for join in joins {
            let keyword = match join.kind {
                JoinKind::Inner => "INNER JOIN",
                JoinKind::Left => "LEFT JOIN",
            };
            let joined = self.table(join.table)?;
            self.sql.push_str(&format!(" {keyword} {joined} ON "));
            self.predicate(&join.on, false)?;
        }
        Ok(())
    }

    fn where_clause(&mut self, predicates: &[Predicate]) -> Result<(), QueryError> {
        if predicates.is_empty() {
            return Ok(());
        }
        self.sql.push_str(" WHERE ");
        for (i, predicate) in predicates.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(" AND ");
            }
            self.predicate(predicate, true)?;
        }
        Ok(())
    }

    fn predicate(&mut self, predicate: &Predicate, nested: bool) -> Result<(), QueryError> {
        match predicate {
            Predicate::Compare { column, op, value } => {
                let col = self.column(column)?;
                let placeholder = self.bind(value.clone());
                self.sql.push_str(&format!("{col} {} {placeholder}", op.sql()));
            }
            Predicate::ColumnEq(left, right) => {
                let l = self.column(left)?;
                let r = self.column(right)?;
                self.sql.push_str(&format!("{l} = {r}"));
            }
            Predicate::Between { column, low, high } => {
                let col = self.column(column)?;
                let lo = self.bind(low.clone());
                let hi = self.bind(high.clone());
                self.sql.push_str(&format!("{col} BETWEEN {lo} AND {hi}"));
            }
            Predicate::Like { column, pattern } => {
                let col = self.column(column)?;
                let placeholder = self.bind(Value::Text(pattern.clone()));
                self.sql.push_str(&format!("{col} LIKE {placeholder}"));
            }
            Predicate::In { column, values } => {
                let col = self.column(column)?;
                if values.is_empty() {
                    return Err(QueryError::EmptyInList { column: col });
                }
                let placeholders: Vec<_> = values.iter().map(|v| self.bind(v.clone())).collect();
                self.sql
                    .push_str(&format!("{col} IN ({})", placeholders.join(", ")));
            }
            Predicate::IsNull(column) => {
                let col = self.column(column)?;
                self.sql.push_str(&format!("{col} IS NULL"));
            }
            Predicate::IsNotNull(column) => {
                let col = self.column(column)?;
                self.sql.push_str(&format!("{col} IS NOT NULL"));
            }
            Predicate::CompareQuery { column, op, query } => {
                let col = self.column(column)?;
                let sub = self.subquery(query)?;
                self.sql.push_str(&format!("{col} {} {sub}", op.sql()));
            }
            Predicate::InQuery { column, query } => {
                let col = self.column(column)?;
                let sub = self.subquery(query)?;
                self.sql.push_str(&format!("{col} IN {sub}"));
            }
            Predicate::And(parts) => {
                if parts.is_empty() {
                    self.sql.push_str("1 = 1");
                } else {
                    self.junction(parts, " AND ", nested && parts.len() > 1)?;
                }
            }
            Predicate::Or(parts) => {
                if parts.is_empty() {
                    self.sql.push_str("1 = 0");
                } else {
                    self.junction(parts, " OR ", parts.len() > 1)?;
                }
            }
            Predicate::Not(inner) => {
                self.sql.push_str("NOT (");
                self.predicate(inner, false)?;
                self.sql.push(')');
            }
        }
        Ok(())
    }

    fn junction(&mut self, parts: &[Predicate], sep: &str, parens: bool) -> Result<(), QueryError> {
        if parens {
            self.sql.push('(');
        }
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(sep);
            }
            self.predicate(part, true)?;
        }
        if parens {
            self.sql.push(')');
        }
        Ok(())
    }

    fn group_by(&mut self, columns: &[ColumnRef]) -> Result<(), QueryError> {
        if columns.is_empty() {
            return Ok(());
        }
        let mut cols = Vec::with_capacity(columns.len());
        for column in columns {
            cols.push(self.column(column)?);
        }
        self.sql.push_str(&format!(" GROUP BY {}", cols.join(", ")));
        Ok(())
    }

    fn order_by(&mut self, order: &[OrderSpec]) -> Result<(), QueryError> {
        if order.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(order.len());
        for spec in order {
            let col = self.column(&spec.column)?;
            let dir = if spec.ascending { "ASC" } else { "DESC" };
            match (spec.nulls, self.dialect.supports_nulls_ordering()) {
                (NullOrdering::Default, _) => clauses.push(format!("{col} {dir}")),
                (NullOrdering::First, true) => clauses.push(format!("{col} {dir} NULLS FIRST")),
                (NullOrdering::Last, true) => clauses.push(format!("{col} {dir} NULLS LAST")),
                (NullOrdering::First, false) => {
                    clauses.push(format!("{col} IS NULL DESC"));
                    clauses.push(format!("{col} {dir}"));
                }
                (NullOrdering::Last, false) => {
                    clauses.push(format!("{col} IS NULL ASC"));
                    clauses.push(format!("{col} {dir}"));
                }
            }
        }
        self.sql.push_str(&format!(" ORDER BY {}", clauses.join(", ")));
        Ok(())
    }

    fn limit_offset(&mut self, limit: Option<u64>, offset: Option<u64>) {
        match (limit, offset) {
            (Some(limit), Some(offset)) => {
                self.sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"))
            }
            (Some(limit), None) => self.sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite and MySQL reject OFFSET without LIMIT.
            (None, Some(offset)) => match self.dialect {
                Dialect::Sqlite | Dialect::Generic => {
                    self.sql.push_str(&format!(" LIMIT -1 OFFSET {offset}"))
                }
                Dialect::MySql => self
                    .sql
                    .push_str(&format!(" LIMIT 18446744073709551615 OFFSET {offset}")),
                Dialect::Postgres => self.sql.push_str(&format!(" OFFSET {offset}")),
            },
            (None, None) => {}
        }
    }
}

/// The kind of value a projection item will be decoded as.
pub fn projection_kinds(query: &SelectQuery) -> Vec<ValueKind> {
    query.projection().iter().map(|item| item.expr.kind()).collect()
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
