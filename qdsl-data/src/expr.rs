//! Typed column handles and the predicate / ordering / projection vocabulary
//! built from them.
//!
//! ```ignore
//! use qdsl_data::model::{member, team};
//!
//! let p = member::AGE.goe(15).and(team::NAME.eq("teamA"));
//! let order = member::USERNAME.desc().nulls_last();
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;

use crate::query::SelectQuery;

/// A bind value or a decoded column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Int(_) => Some(ValueKind::Int),
            Value::Float(_) => Some(ValueKind::Float),
            Value::Text(_) => Some(ValueKind::Text),
            Value::Null => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Null => f.write_str("NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Storage class of a column, used by engines to decode result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Float,
    Text,
}

/// Rust types that map onto a column kind.
pub trait SqlType: Into<Value> {
    const KIND: ValueKind;
}

impl SqlType for i64 {
    const KIND: ValueKind = ValueKind::Int;
}

impl SqlType for i32 {
    const KIND: ValueKind = ValueKind::Int;
}

impl SqlType for f64 {
    const KIND: ValueKind = ValueKind::Float;
}

impl SqlType for String {
    const KIND: ValueKind = ValueKind::Text;
}

fn typed_value<T: SqlType>(value: impl Into<T>) -> Value {
    let typed: T = value.into();
    typed.into()
}

/// A table with the alias used to qualify its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub name: &'static str,
    pub alias: &'static str,
}

impl TableRef {
    pub const fn new(name: &'static str, alias: &'static str) -> Self {
        Self { name, alias }
    }
}

/// Untyped column reference: table alias, column name and storage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub alias: &'static str,
    pub name: &'static str,
    pub kind: ValueKind,
}

impl ColumnRef {
    /// `alias.name`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.alias, self.name)
    }
}

/// A column of type `T`. Comparisons only accept values convertible to `T`.
pub struct Column<T> {
    column: ColumnRef,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Column<T> {}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column({})", self.column.qualified())
    }
}

impl<T: SqlType> Column<T> {
    pub const fn new(alias: &'static str, name: &'static str) -> Self {
        Self {
            column: ColumnRef {
                alias,
                name,
                kind: T::KIND,
            },
            _ty: PhantomData,
        }
    }

    pub fn column_ref(&self) -> ColumnRef {
        self.column
    }

    fn compare(self, op: CompareOp, value: impl Into<T>) -> Predicate {
        Predicate::Compare {
            column: self.column,
            op,
            value: typed_value::<T>(value),
        }
    }

    pub fn eq(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn gt(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    /// Greater than or equal.
    pub fn goe(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Goe, value)
    }

    pub fn lt(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    /// Less than or equal.
    pub fn loe(self, value: impl Into<T>) -> Predicate {
        self.compare(CompareOp::Loe, value)
    }

    /// Inclusive on both ends.
    pub fn between(self, low: impl Into<T>, high: impl Into<T>) -> Predicate {
        Predicate::Between {
            column: self.column,
            low: typed_value::<T>(low),
            high: typed_value::<T>(high),
        }
    }

    pub fn in_list<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<T>,
    {
        Predicate::In {
            column: self.column,
            values: values.into_iter().map(|v| typed_value::<T>(v)).collect(),
        }
    }

    pub fn is_null(self) -> Predicate {
        Predicate::IsNull(self.column)
    }

    pub fn is_not_null(self) -> Predicate {
        Predicate::IsNotNull(self.column)
    }

    /// `column op (query)`, where `query` yields a single value.
    pub fn compare_query(self, op: CompareOp, query: SelectQuery) -> Predicate {
        Predicate::CompareQuery {
            column: self.column,
            op,
            query: Box::new(query),
        }
    }

    pub fn eq_query(self, query: SelectQuery) -> Predicate {
        self.compare_query(CompareOp::Eq, query)
    }

    pub fn goe_query(self, query: SelectQuery) -> Predicate {
        self.compare_query(CompareOp::Goe, query)
    }

    pub fn gt_query(self, query: SelectQuery) -> Predicate {
        self.compare_query(CompareOp::Gt, query)
    }

    pub fn lt_query(self, query: SelectQuery) -> Predicate {
        self.compare_query(CompareOp::Lt, query)
    }

    pub fn loe_query(self, query: SelectQuery) -> Predicate {
        self.compare_query(CompareOp::Loe, query)
    }

    /// `column IN (query)`; the first projected column supplies the candidates.
    pub fn in_query(self, query: SelectQuery) -> Predicate {
        Predicate::InQuery {
            column: self.column,
            query: Box::new(query),
        }
    }

    /// Start a simple `CASE` over this column:
    /// `AGE.when(20).then("twenty").when(21).then("twenty-one").otherwise("other")`.
    pub fn when(self, value: impl Into<T>) -> SimpleWhen<T> {
        SimpleWhen {
            case: SimpleCase {
                column: self,
                branches: CaseBuilder::new(),
            },
            value: typed_value::<T>(value),
        }
    }

    /// Column-to-column equality, used for join conditions.
    pub fn eq_column(self, other: Column<T>) -> Predicate {
        Predicate::ColumnEq(self.column, other.column)
    }

    pub fn asc(self) -> OrderSpec {
        OrderSpec::new(self.column, true)
    }

    pub fn desc(self) -> OrderSpec {
        OrderSpec::new(self.column, false)
    }

    /// Select this column under its own name.
    pub fn select(self) -> SelectItem {
        SelectItem::new(Expr::Column(self.column), self.column.name)
    }

    /// Select this column under `label` (`SELECT m.member_id AS member_id`).
    pub fn as_(self, label: &str) -> SelectItem {
        SelectItem::new(Expr::Column(self.column), label)
    }

    pub fn count(self) -> SelectItem {
        self.aggregate(AggregateFn::Count)
    }

    pub fn max(self) -> SelectItem {
        self.aggregate(AggregateFn::Max)
    }

    pub fn min(self) -> SelectItem {
        self.aggregate(AggregateFn::Min)
    }

    fn aggregate(self, func: AggregateFn) -> SelectItem {
        let label = format!("{}_{}", func.label(), self.column.name);
        SelectItem::new(Expr::Aggregate(func, self.column), &label)
    }
}

impl Column<i32> {
    pub fn sum(self) -> SelectItem {
        self.aggregate(AggregateFn::Sum)
    }

    pub fn avg(self) -> SelectItem {
        self.aggregate(AggregateFn::Avg)
    }
}

impl Column<String> {
    /// SQL `LIKE` with a caller-supplied pattern.
    pub fn like(self, pattern: &str) -> Predicate {
        Predicate::Like {
            column: self.column,
            pattern: pattern.to_string(),
        }
    }

    /// `LIKE '%value%'`
    pub fn contains(self, value: &str) -> Predicate {
        self.like(&format!("%{value}%"))
    }

    /// `LIKE 'value%'`
    pub fn starts_with(self, value: &str) -> Predicate {
        self.like(&format!("{value}%"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Goe,
    Lt,
    Loe,
}

impl CompareOp {
    pub fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Goe => ">=",
            CompareOp::Lt => "<",
            CompareOp::Loe => "<=",
        }
    }
}

/// A boolean condition over the joined columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: ColumnRef,
        op: CompareOp,
        value: Value,
    },
    ColumnEq(ColumnRef, ColumnRef),
    Between {
        column: ColumnRef,
        low: Value,
        high: Value,
    },
    Like {
        column: ColumnRef,
        pattern: String,
    },
    In {
        column: ColumnRef,
        values: Vec<Value>,
    },
    IsNull(ColumnRef),
    IsNotNull(ColumnRef),
    /// Comparison against a scalar subquery.
    CompareQuery {
        column: ColumnRef,
        op: CompareOp,
        query: Box<SelectQuery>,
    },
    InQuery {
        column: ColumnRef,
        query: Box<SelectQuery>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Conjunction; nested `And`s are flattened.
    pub fn and(self, other: Predicate) -> Predicate {
        let mut parts = self.into_conjuncts();
        parts.extend(other.into_conjuncts());
        Predicate::And(parts)
    }

    /// Disjunction; nested `Or`s are flattened.
    pub fn or(self, other: Predicate) -> Predicate {
        let mut parts = match self {
            Predicate::Or(parts) => parts,
            p => vec![p],
        };
        match other {
            Predicate::Or(more) => parts.extend(more),
            p => parts.push(p),
        }
        Predicate::Or(parts)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// Split a top-level `And` into its parts.
    pub fn into_conjuncts(self) -> Vec<Predicate> {
        match self {
            Predicate::And(parts) => parts,
            p => vec![p],
        }
    }

    /// Whether any column under `alias` takes part in this predicate.
    pub fn references_alias(&self, alias: &str) -> bool {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::Between { column, .. }
            | Predicate::Like { column, .. }
            | Predicate::In { column, .. }
            | Predicate::IsNull(column)
            | Predicate::IsNotNull(column) => column.alias == alias,
            Predicate::ColumnEq(a, b) => a.alias == alias || b.alias == alias,
            Predicate::CompareQuery { column, query, .. }
            | Predicate::InQuery { column, query } => {
                column.alias == alias || query.references_alias(alias)
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter().any(|p| p.references_alias(alias))
            }
            Predicate::Not(inner) => inner.references_alias(alias),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullOrdering {
    /// Whatever the database does.
    #[default]
    Default,
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSpec {
    pub column: ColumnRef,
    pub ascending: bool,
    pub nulls: NullOrdering,
}

impl OrderSpec {
    pub fn new(column: ColumnRef, ascending: bool) -> Self {
        Self {
            column,
            ascending,
            nulls: NullOrdering::Default,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullOrdering::First;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullOrdering::Last;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFn {
    pub fn sql(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Max => "MAX",
            AggregateFn::Min => "MIN",
        }
    }

    fn label(self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Max => "max",
            AggregateFn::Min => "min",
        }
    }
}

/// A selectable expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Aggregate(AggregateFn, ColumnRef),
    /// `COUNT(*)`
    CountAll,
    /// `COUNT(*) OVER ()`: the row count before `LIMIT`/`OFFSET`, repeated on every row.
    WindowCount,
    /// Scalar subquery: the first column of its first row, NULL when it has none.
    Subquery(Box<SelectQuery>),
    Case(Box<CaseExpr>),
}

impl Expr {
    /// Storage kind of the value this expression yields.
    pub fn kind(&self) -> ValueKind {
        match self {
            Expr::Column(column) => column.kind,
            Expr::Aggregate(AggregateFn::Avg, _) => ValueKind::Float,
            Expr::Aggregate(AggregateFn::Count, _) | Expr::CountAll | Expr::WindowCount => {
                ValueKind::Int
            }
            Expr::Aggregate(_, column) => column.kind,
            Expr::Subquery(query) => query
                .projection()
                .first()
                .map_or(ValueKind::Int, |item| item.expr.kind()),
            Expr::Case(case) => case.kind(),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Aggregate(..) | Expr::CountAll)
    }

    pub fn subquery(query: SelectQuery) -> Expr {
        Expr::Subquery(Box::new(query))
    }

    /// Whether this expression reads a column under `alias`.
    pub fn references_alias(&self, alias: &str) -> bool {
        match self {
            Expr::Column(column) | Expr::Aggregate(_, column) => column.alias == alias,
            Expr::CountAll | Expr::WindowCount => false,
            Expr::Subquery(query) => query.references_alias(alias),
            Expr::Case(case) => case
                .branches
                .iter()
                .any(|(condition, _)| condition.references_alias(alias)),
        }
    }

    /// Select this expression under `label`.
    pub fn as_(self, label: &str) -> SelectItem {
        SelectItem::new(self, label)
    }
}

/// Searched `CASE WHEN condition THEN value ... ELSE otherwise END`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub branches: Vec<(Predicate, Value)>,
    pub otherwise: Value,
}

impl CaseExpr {
    /// Kind of the first non-NULL result; text when every result is NULL.
    pub fn kind(&self) -> ValueKind {
        self.branches
            .iter()
            .map(|(_, value)| value)
            .chain(std::iter::once(&self.otherwise))
            .find_map(Value::kind)
            .unwrap_or(ValueKind::Text)
    }
}

/// Builder for a searched `CASE`:
///
/// ```ignore
/// let band = CaseBuilder::new()
///     .when(member::AGE.between(0, 20)).then("0~20")
///     .when(member::AGE.between(21, 30)).then("21~30")
///     .otherwise("other");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CaseBuilder {
    branches: Vec<(Predicate, Value)>,
}

impl CaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(self, condition: Predicate) -> When {
        When {
            case: self,
            condition,
        }
    }

    pub fn otherwise(self, value: impl Into<Value>) -> Expr {
        Expr::Case(Box::new(CaseExpr {
            branches: self.branches,
            otherwise: value.into(),
        }))
    }
}

/// A `WHEN` waiting for its `THEN`.
#[derive(Debug, Clone)]
pub struct When {
    case: CaseBuilder,
    condition: Predicate,
}

impl When {
    pub fn then(mut self, value: impl Into<Value>) -> CaseBuilder {
        self.case.branches.push((self.condition, value.into()));
        self.case
    }
}

/// Simple `CASE` over one column, rendered as a searched `CASE` of equalities.
#[derive(Debug, Clone)]
pub struct SimpleCase<T> {
    column: Column<T>,
    branches: CaseBuilder,
}

impl<T: SqlType> SimpleCase<T> {
    pub fn when(self, value: impl Into<T>) -> SimpleWhen<T> {
        SimpleWhen {
            value: typed_value::<T>(value),
            case: self,
        }
    }

    pub fn otherwise(self, value: impl Into<Value>) -> Expr {
        self.branches.otherwise(value)
    }
}

#[derive(Debug, Clone)]
pub struct SimpleWhen<T> {
    case: SimpleCase<T>,
    value: Value,
}

impl<T: SqlType> SimpleWhen<T> {
    pub fn then(self, result: impl Into<Value>) -> SimpleCase<T> {
        let SimpleWhen { mut case, value } = self;
        let condition = Predicate::Compare {
            column: case.column.column_ref(),
            op: CompareOp::Eq,
            value,
        };
        case.branches = case.branches.when(condition).then(result);
        case
    }
}

/// Label of the [`SelectItem::window_count`] column.
pub const WINDOW_COUNT_LABEL: &str = "total_count";

/// One entry of a projection: an expression and the label it is read back under.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub label: String,
}

impl SelectItem {
    pub fn new(expr: Expr, label: &str) -> Self {
        Self {
            expr,
            label: label.to_string(),
        }
    }

    /// `COUNT(*) AS count`
    pub fn count_all() -> Self {
        Self::new(Expr::CountAll, "count")
    }

    /// `COUNT(*) OVER () AS total_count`
    pub fn window_count() -> Self {
        Self::new(Expr::WindowCount, WINDOW_COUNT_LABEL)
    }

    /// Rename the label.
    pub fn as_(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGE: Column<i32> = Column::new("m", "age");
    const NAME: Column<String> = Column::new("t", "name");

    #[test]
    fn test_and_flattens() {
        let p = AGE.goe(1).and(AGE.loe(5)).and(NAME.eq("teamA"));
        assert!(matches!(&p, Predicate::And(parts) if parts.len() == 3));
    }

    #[test]
    fn test_or_flattens() {
        let p = AGE.eq(1).or(AGE.eq(2)).or(AGE.eq(3));
        assert!(matches!(&p, Predicate::Or(parts) if parts.len() == 3));
    }

    #[test]
    fn test_references_alias() {
        let p = AGE.goe(1).and(NAME.eq("teamA").not());
        assert!(p.references_alias("t"));
        assert!(!AGE.goe(1).references_alias("t"));
    }

    #[test]
    fn test_typed_values() {
        assert_eq!(
            AGE.eq(21),
            Predicate::Compare {
                column: AGE.column_ref(),
                op: CompareOp::Eq,
                value: Value::Int(21)
            }
        );
        assert_eq!(NAME.contains("eam"), NAME.like("%eam%"));
    }

    #[test]
    fn test_simple_case_becomes_equalities() {
        let expr = AGE.when(20).then("twenty").when(21).then("twenty-one").otherwise("other");
        let Expr::Case(case) = &expr else {
            panic!("expected a CASE, got {expr:?}");
        };
        assert_eq!(case.branches.len(), 2);
        assert_eq!(case.branches[1].0, AGE.eq(21));
        assert_eq!(case.branches[1].1, Value::from("twenty-one"));
        assert_eq!(expr.kind(), ValueKind::Text);
        assert!(expr.references_alias("m"));
    }

    #[test]
    fn test_case_kind_skips_null_results() {
        let expr = CaseBuilder::new()
            .when(AGE.gt(30))
            .then(Value::Null)
            .otherwise(0);
        assert_eq!(expr.kind(), ValueKind::Int);
    }

    #[test]
    fn test_aggregate_kinds() {
        assert_eq!(AGE.avg().expr.kind(), ValueKind::Float);
        assert_eq!(AGE.sum().expr.kind(), ValueKind::Int);
        assert_eq!(NAME.max().label, "max_name");
        assert_eq!(SelectItem::count_all().expr.kind(), ValueKind::Int);
    }
}
