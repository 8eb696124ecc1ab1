//! Interpreter for composed queries over a [`Dataset`].
//!
//! Follows SQLite semantics where they matter to callers: three-valued
//! predicate logic, NULLs sorting lowest, case-insensitive ASCII `LIKE`, and
//! bare columns in a grouped projection taken from the group's first row.
//! A subquery sees the row of its enclosing query, so correlated subqueries
//! work; aliases it binds itself shadow the enclosing ones.

use std::cmp::Ordering;
use std::fmt;

use qdsl_data::expr::{
    AggregateFn, ColumnRef, CompareOp, Expr, NullOrdering, OrderSpec, Predicate, TableRef, Value,
};
use qdsl_data::query::{Assignment, CountQuery, Join, JoinKind, Mutation, SelectQuery};
use qdsl_data::{DataError, Row};

use crate::dataset::{Dataset, Table};

/// Failure raised by the in-memory engine, surfaced as `DataError::Database`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError(pub String);

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for EngineError {}

pub(crate) fn engine_error(msg: impl Into<String>) -> DataError {
    DataError::database(EngineError(msg.into()))
}

#[derive(Clone, Copy)]
struct Binding<'a> {
    table_ref: TableRef,
    table: &'a Table,
    /// `None` for the NULL side of an unmatched left join.
    row: Option<&'a [Value]>,
}

#[derive(Clone)]
struct Tuple<'a> {
    bindings: Vec<Binding<'a>>,
}

impl<'a> Tuple<'a> {
    fn single(table_ref: TableRef, table: &'a Table, row: &'a [Value]) -> Self {
        Self::scoped(None, table_ref, table, row)
    }

    /// A base row on top of the enclosing query's bindings.
    fn scoped(
        outer: Option<&Tuple<'a>>,
        table_ref: TableRef,
        table: &'a Table,
        row: &'a [Value],
    ) -> Self {
        let mut bindings = outer.map_or_else(Vec::new, |t| t.bindings.clone());
        bindings.push(Binding {
            table_ref,
            table,
            row: Some(row),
        });
        Self { bindings }
    }

    fn extended(&self, binding: Binding<'a>) -> Self {
        let mut next = self.clone();
        next.bindings.push(binding);
        next
    }

    fn value(&self, column: &ColumnRef) -> Result<Value, DataError> {
        let binding = self
            .bindings
            .iter()
            .rev()
            .find(|b| b.table_ref.alias == column.alias)
            .ok_or_else(|| engine_error(format!("no such table alias: {}", column.alias)))?;
        let idx = binding
            .table
            .column_index(column.name)
            .ok_or_else(|| engine_error(format!("no such column: {}", column.qualified())))?;
        Ok(binding.row.map_or(Value::Null, |row| row[idx].clone()))
    }
}

fn source<'a>(data: &'a Dataset, table: TableRef) -> Result<&'a Table, DataError> {
    data.table(table.name)
        .ok_or_else(|| engine_error(format!("no such table: {}", table.name)))
}

/// FROM + JOIN + WHERE.
fn filtered<'a>(
    data: &'a Dataset,
    table: TableRef,
    joins: &[Join],
    predicates: &[Predicate],
    outer: Option<&Tuple<'a>>,
) -> Result<Vec<Tuple<'a>>, DataError> {
    let base = source(data, table)?;
    let mut tuples: Vec<Tuple<'a>> = base
        .rows()
        .iter()
        .map(|row| Tuple::scoped(outer, table, base, row))
        .collect();

    for join in joins {
        let joined = source(data, join.table)?;
        let mut next = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            let mut matched = false;
            for row in joined.rows() {
                let candidate = tuple.extended(Binding {
                    table_ref: join.table,
                    table: joined,
                    row: Some(row),
                });
                if eval(data, &join.on, &candidate)? == Some(true) {
                    next.push(candidate);
                    matched = true;
                }
            }
            if !matched && join.kind == JoinKind::Left {
                next.push(tuple.extended(Binding {
                    table_ref: join.table,
                    table: joined,
                    row: None,
                }));
            }
        }
        tuples = next;
    }

    let mut kept = Vec::with_capacity(tuples.len());
    for tuple in tuples {
        if holds(data, predicates, &tuple)? {
            kept.push(tuple);
        }
    }
    Ok(kept)
}

fn holds<'a>(
    data: &'a Dataset,
    predicates: &[Predicate],
    tuple: &Tuple<'a>,
) -> Result<bool, DataError> {
    for predicate in predicates {
        if eval(data, predicate, tuple)? != Some(true) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn holds_op(op: CompareOp, left: &Value, right: &Value) -> Option<bool> {
    compare(left, right).map(|ord| match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Ne => ord != Ordering::Equal,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Goe => ord != Ordering::Less,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Loe => ord != Ordering::Greater,
    })
}

/// `v IN (candidates)` with SQL NULL handling.
fn in_values(v: &Value, candidates: &[Value]) -> Option<bool> {
    if v.is_null() {
        None
    } else if candidates.iter().any(|c| compare(v, c) == Some(Ordering::Equal)) {
        Some(true)
    } else if candidates.iter().any(Value::is_null) {
        None
    } else {
        Some(false)
    }
}

/// First projected column of every row of `query`, run inside `outer`.
fn first_column<'a>(
    data: &'a Dataset,
    query: &SelectQuery,
    outer: Option<&Tuple<'a>>,
) -> Result<Vec<Value>, DataError> {
    let label = match query.projection().first() {
        Some(item) => item.label.as_str(),
        None => return Err(engine_error("subquery without projection")),
    };
    let (rows, _) = select_in(data, query, outer)?;
    Ok(rows
        .iter()
        .map(|row| row.get(label).cloned().unwrap_or(Value::Null))
        .collect())
}

/// Scalar subquery: first row wins, no rows is NULL.
fn scalar<'a>(
    data: &'a Dataset,
    query: &SelectQuery,
    outer: Option<&Tuple<'a>>,
) -> Result<Value, DataError> {
    Ok(first_column(data, query, outer)?
        .into_iter()
        .next()
        .unwrap_or(Value::Null))
}

/// `None` is SQL UNKNOWN.
fn eval<'a>(
    data: &'a Dataset,
    predicate: &Predicate,
    tuple: &Tuple<'a>,
) -> Result<Option<bool>, DataError> {
    Ok(match predicate {
        Predicate::Compare { column, op, value } => holds_op(*op, &tuple.value(column)?, value),
        Predicate::CompareQuery { column, op, query } => {
            let left = tuple.value(column)?;
            holds_op(*op, &left, &scalar(data, query, Some(tuple))?)
        }
        Predicate::InQuery { column, query } => {
            let v = tuple.value(column)?;
            in_values(&v, &first_column(data, query, Some(tuple))?)
        }
        Predicate::ColumnEq(a, b) => {
            compare(&tuple.value(a)?, &tuple.value(b)?).map(|ord| ord == Ordering::Equal)
        }
        Predicate::Between { column, low, high } => {
            let v = tuple.value(column)?;
            match (compare(&v, low), compare(&v, high)) {
                (Some(lo), Some(hi)) => Some(lo != Ordering::Less && hi != Ordering::Greater),
                _ => None,
            }
        }
        Predicate::Like { column, pattern } => match tuple.value(column)? {
            Value::Null => None,
            Value::Text(s) => Some(like(&s, pattern)),
            other => Some(like(&other.to_string(), pattern)),
        },
        Predicate::In { column, values } => in_values(&tuple.value(column)?, values),
        Predicate::IsNull(column) => Some(tuple.value(column)?.is_null()),
        Predicate::IsNotNull(column) => Some(!tuple.value(column)?.is_null()),
        Predicate::And(parts) => {
            let mut unknown = false;
            for part in parts {
                match eval(data, part, tuple)? {
                    Some(false) => return Ok(Some(false)),
                    None => unknown = true,
                    Some(true) => {}
                }
            }
            if unknown {
                None
            } else {
                Some(true)
            }
        }
        Predicate::Or(parts) => {
            let mut unknown = false;
            for part in parts {
                match eval(data, part, tuple)? {
                    Some(true) => return Ok(Some(true)),
                    None => unknown = true,
                    Some(false) => {}
                }
            }
            if unknown {
                None
            } else {
                Some(false)
            }
        }
        Predicate::Not(inner) => eval(data, inner, tuple)?.map(|b| !b),
    })
}

/// SQL comparison; `None` when either side is NULL.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        // numbers sort before text
        (Value::Text(_), _) => Some(Ordering::Greater),
        (_, Value::Text(_)) => Some(Ordering::Less),
        (x, y) => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

fn like(value: &str, pattern: &str) -> bool {
    let v: Vec<char> = value.to_ascii_lowercase().chars().collect();
    let p: Vec<char> = pattern.to_ascii_lowercase().chars().collect();
    // matches[j]: does v[..i] match p[..j]
    let mut matches = vec![false; p.len() + 1];
    matches[0] = true;
    for j in 1..=p.len() {
        matches[j] = matches[j - 1] && p[j - 1] == '%';
    }
    for c in &v {
        let mut next = vec![false; p.len() + 1];
        for j in 1..=p.len() {
            next[j] = match p[j - 1] {
                '%' => next[j - 1] || matches[j],
                '_' => matches[j - 1],
                pc => matches[j - 1] && pc == *c,
            };
        }
        matches = next;
    }
    matches[p.len()]
}

fn order_cmp(a: &Value, b: &Value, spec: &OrderSpec) -> Ordering {
    let nulls_first = match spec.nulls {
        NullOrdering::First => true,
        NullOrdering::Last => false,
        NullOrdering::Default => spec.ascending,
    };
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) if nulls_first => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, true) if nulls_first => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = compare(a, b).unwrap_or(Ordering::Equal);
            if spec.ascending {
                ord
            } else {
                ord.reverse()
            }
        }
    }
}

fn group<'a>(tuples: Vec<Tuple<'a>>, by: &[ColumnRef]) -> Result<Vec<Vec<Tuple<'a>>>, DataError> {
    let mut groups: Vec<(Vec<Value>, Vec<Tuple<'a>>)> = Vec::new();
    for tuple in tuples {
        let key = by
            .iter()
            .map(|c| tuple.value(c))
            .collect::<Result<Vec<_>, _>>()?;
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(tuple),
            None => groups.push((key, vec![tuple])),
        }
    }
    Ok(groups.into_iter().map(|(_, members)| members).collect())
}

fn aggregate(func: AggregateFn, values: Vec<Value>) -> Value {
    let present: Vec<Value> = values.into_iter().filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return match func {
            AggregateFn::Count => Value::Int(0),
            _ => Value::Null,
        };
    }
    match func {
        AggregateFn::Count => Value::Int(present.len() as i64),
        AggregateFn::Sum => {
            if present.iter().all(|v| matches!(v, Value::Int(_))) {
                Value::Int(present.iter().filter_map(Value::as_i64).sum())
            } else {
                Value::Float(present.iter().filter_map(Value::as_f64).sum())
            }
        }
        AggregateFn::Avg => {
            let sum: f64 = present.iter().filter_map(Value::as_f64).sum();
            Value::Float(sum / present.len() as f64)
        }
        AggregateFn::Max => present
            .into_iter()
            .max_by(|a, b| compare(a, b).unwrap_or(Ordering::Equal))
            .unwrap_or(Value::Null),
        AggregateFn::Min => present
            .into_iter()
            .min_by(|a, b| compare(a, b).unwrap_or(Ordering::Equal))
            .unwrap_or(Value::Null),
    }
}

/// Value of one projection item for a row (or group) of tuples.
fn project<'a>(
    data: &'a Dataset,
    expr: &Expr,
    unit: &[Tuple<'a>],
    total: u64,
    outer: Option<&Tuple<'a>>,
) -> Result<Value, DataError> {
    Ok(match expr {
        Expr::Column(column) => match unit.first() {
            Some(first) => first.value(column)?,
            None => Value::Null,
        },
        Expr::Aggregate(func, column) => {
            let values = unit
                .iter()
                .map(|t| t.value(column))
                .collect::<Result<Vec<_>, _>>()?;
            aggregate(*func, values)
        }
        Expr::CountAll => Value::Int(unit.len() as i64),
        Expr::WindowCount => Value::Int(total as i64),
        Expr::Subquery(query) => scalar(data, query, unit.first().or(outer))?,
        Expr::Case(case) => match unit.first() {
            Some(first) => {
                let mut result = case.otherwise.clone();
                for (condition, value) in &case.branches {
                    if eval(data, condition, first)? == Some(true) {
                        result = value.clone();
                        break;
                    }
                }
                result
            }
            None => Value::Null,
        },
    })
}

/// Rows within the query bounds, and the number of rows before the bounds.
pub(crate) fn select(data: &Dataset, query: &SelectQuery) -> Result<(Vec<Row>, u64), DataError> {
    select_in(data, query, None)
}

fn select_in<'a>(
    data: &'a Dataset,
    query: &SelectQuery,
    outer: Option<&Tuple<'a>>,
) -> Result<(Vec<Row>, u64), DataError> {
    let tuples = filtered(data, query.table(), query.joins(), query.predicates(), outer)?;
    let grouped = !query.grouping().is_empty()
        || query.projection().iter().any(|item| item.expr.is_aggregate());

    let units: Vec<Vec<Tuple<'_>>> = if !query.grouping().is_empty() {
        group(tuples, query.grouping())?
    } else if grouped {
        vec![tuples]
    } else {
        tuples.into_iter().map(|t| vec![t]).collect()
    };

    let mut keyed = Vec::with_capacity(units.len());
    for unit in units {
        let keys = match unit.first() {
            Some(first) => query
                .ordering()
                .iter()
                .map(|spec| first.value(&spec.column))
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![Value::Null; query.ordering().len()],
        };
        keyed.push((keys, unit));
    }
    keyed.sort_by(|(a, _), (b, _)| {
        query
            .ordering()
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(spec, (x, y))| order_cmp(x, y, spec))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    let total = keyed.len() as u64;
    let offset = usize::try_from(query.offset_value().unwrap_or(0)).unwrap_or(usize::MAX);
    let limit = query
        .limit_value()
        .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

    let mut rows = Vec::new();
    for (_, unit) in keyed.into_iter().skip(offset).take(limit) {
        let mut row = Row::new();
        for item in query.projection() {
            let value = project(data, &item.expr, &unit, total, outer)?;
            row.push(item.label.clone(), value);
        }
        rows.push(row);
    }
    Ok((rows, total))
}

pub(crate) fn count(data: &Dataset, query: &CountQuery) -> Result<u64, DataError> {
    let tuples = filtered(data, query.table(), query.joins(), query.predicates(), None)?;
    if query.grouping().is_empty() {
        Ok(tuples.len() as u64)
    } else {
        Ok(group(tuples, query.grouping())?.len() as u64)
    }
}

/// Indices of the rows of `table_ref` matching every predicate.
fn matching_rows(
    data: &Dataset,
    table_ref: TableRef,
    predicates: &[Predicate],
) -> Result<Vec<usize>, DataError> {
    let table = source(data, table_ref)?;
    let mut matched = Vec::new();
    for (idx, row) in table.rows().iter().enumerate() {
        if holds(data, predicates, &Tuple::single(table_ref, table, row))? {
            matched.push(idx);
        }
    }
    Ok(matched)
}

fn add(current: &Value, delta: &Value) -> Result<Value, DataError> {
    match (current, delta) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Float(x + y)),
            _ => Err(engine_error(format!("cannot add {b} to {a}"))),
        },
    }
}

pub(crate) fn execute(data: &mut Dataset, mutation: &Mutation) -> Result<u64, DataError> {
    let table_ref = mutation.table();
    match mutation {
        Mutation::Update(update) => {
            let matched = matching_rows(data, table_ref, update.predicates())?;
            let table = source(data, table_ref)?;
            let mut changes = Vec::new();
            for &idx in &matched {
                let row = &table.rows()[idx];
                for assignment in update.assignments() {
                    let column = assignment.column();
                    let col = table
                        .column_index(column.name)
                        .ok_or_else(|| engine_error(format!("no such column: {}", column.name)))?;
                    let value = match assignment {
                        Assignment::Set(_, value) => value.clone(),
                        Assignment::Add(_, delta) => add(&row[col], delta)?,
                    };
                    changes.push((idx, col, value));
                }
            }
            let table = data
                .table_mut(table_ref.name)
                .ok_or_else(|| engine_error(format!("no such table: {}", table_ref.name)))?;
            for (idx, col, value) in changes {
                table.rows_mut()[idx][col] = value;
            }
            Ok(matched.len() as u64)
        }
        Mutation::Delete(delete) => {
            let matched = matching_rows(data, table_ref, delete.predicates())?;
            let table = data
                .table_mut(table_ref.name)
                .ok_or_else(|| engine_error(format!("no such table: {}", table_ref.name)))?;
            let mut idx = 0;
            table.rows_mut().retain(|_| {
                let keep = matched.binary_search(&idx).is_err();
                idx += 1;
                keep
            });
            Ok(matched.len() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use qdsl_data::expr::CaseBuilder;
    use qdsl_data::model::{member, member_sub, team};
    use qdsl_data::query::{DeleteQuery, UpdateQuery};
    use qdsl_data::{MemberTeamDto, Projection};

    fn usernames(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|r| r.get_string("username").unwrap().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_like() {
        assert!(like("member1", "mem%"));
        assert!(like("member1", "%BER_"));
        assert!(like("", "%"));
        assert!(!like("member1", "member"));
        assert!(!like("team", "_"));
    }

    #[test]
    fn test_three_valued_logic() {
        let data = fixtures::member_team_dataset().with(&[fixtures::loner()]);
        let q = SelectQuery::new(member::TABLE)
            .select([member::USERNAME.select()])
            .left_join(team::TABLE, member::TEAM_ID.eq_column(team::ID))
            .filter(team::NAME.ne("teamA"));
        let (rows, _) = select(&data, &q).unwrap();
        // NULL != 'teamA' is unknown, so the loner is filtered out
        assert_eq!(usernames(&rows), vec!["member3", "member4"]);
    }

    #[test]
    fn test_left_join_keeps_unmatched() {
        let data = fixtures::member_team_dataset().with(&[fixtures::loner()]);
        let q = SelectQuery::new(member::TABLE)
            .select(MemberTeamDto::projection())
            .left_join(team::TABLE, member::TEAM_ID.eq_column(team::ID))
            .filter(team::NAME.is_null());
        let (rows, total) = select(&data, &q).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].get("team_name"), Some(&Value::Null));
    }

    #[test]
    fn test_order_nulls_and_bounds() {
        let data = fixtures::member_team_dataset().with(&[fixtures::loner()]);
        let q = SelectQuery::new(member::TABLE)
            .select([member::USERNAME.select()])
            .left_join(team::TABLE, member::TEAM_ID.eq_column(team::ID))
            .order_by(team::NAME.asc())
            .order_by(member::AGE.desc())
            .offset(1)
            .limit(3);
        let (rows, total) = select(&data, &q).unwrap();
        assert_eq!(total, 5);
        assert_eq!(usernames(&rows), vec!["member2", "member1", "member3"]);
    }

    #[test]
    fn test_group_by_aggregates() {
        let data = fixtures::member_team_dataset();
        let q = SelectQuery::new(member::TABLE)
            .select([team::NAME.as_("team_name"), member::AGE.avg(), member::AGE.sum()])
            .inner_join(team::TABLE, member::TEAM_ID.eq_column(team::ID))
            .group_by(team::NAME)
            .order_by(team::NAME.desc());
        let (rows, total) = select(&data, &q).unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].get_string("team_name").unwrap().as_deref(), Some("teamB"));
        assert_eq!(rows[0].get_f64("avg_age").unwrap(), Some(24.0));
        assert_eq!(rows[1].get_i64("sum_age").unwrap(), Some(46));
        assert_eq!(count(&data, &q.to_count_query()).unwrap(), 2);
    }

    #[test]
    fn test_aggregate_over_empty_input() {
        let data = fixtures::member_team_dataset();
        let q = SelectQuery::new(member::TABLE)
            .select([member::AGE.max(), member::ID.count()])
            .filter(member::AGE.gt(100));
        let (rows, _) = select(&data, &q).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("max_age"), Some(&Value::Null));
        assert_eq!(rows[0].get("count_member_id"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_unknown_column_is_database_error() {
        let data = fixtures::member_team_dataset();
        let q = SelectQuery::new(member::TABLE).select([team::NAME.select()]);
        assert!(matches!(select(&data, &q), Err(DataError::Database(_))));
    }

    #[test]
    fn test_update_and_delete() {
        let mut data = fixtures::member_team_dataset();
        let renamed = execute(
            &mut data,
            &UpdateQuery::new(member::TABLE)
                .set(member::USERNAME, "non-member")
                .filter(member::AGE.lt(24))
                .into(),
        )
        .unwrap();
        assert_eq!(renamed, 1);

        let bumped = execute(
            &mut data,
            &UpdateQuery::new(member::TABLE).set_add(member::AGE, 1).into(),
        )
        .unwrap();
        assert_eq!(bumped, 4);

        let deleted = execute(
            &mut data,
            &DeleteQuery::new(member::TABLE).filter(member::AGE.gt(25)).into(),
        )
        .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(data.row_count("member"), 3);

        let q = SelectQuery::new(member::TABLE)
            .select([member::USERNAME.select(), member::AGE.select()])
            .order_by(member::ID.asc());
        let (rows, _) = select(&data, &q).unwrap();
        assert_eq!(usernames(&rows), vec!["non-member", "member3", "member4"]);
        assert_eq!(rows[0].get_i32("age").unwrap(), Some(22));
    }

    fn avg_age() -> SelectQuery {
        SelectQuery::new(member_sub::TABLE).select([member_sub::AGE.avg()])
    }

    #[test]
    fn test_scalar_subquery_in_where() {
        let data = fixtures::member_team_dataset();
        let q = SelectQuery::new(member::TABLE)
            .select([member::USERNAME.select()])
            .filter(member::AGE.goe_query(avg_age()))
            .order_by(member::ID.asc());
        let (rows, _) = select(&data, &q).unwrap();
        assert_eq!(usernames(&rows), vec!["member2", "member3", "member4"]);
    }

    #[test]
    fn test_correlated_subquery_sees_outer_row() {
        let data = fixtures::member_team_dataset();
        let oldest_in_team = SelectQuery::new(member_sub::TABLE)
            .select([member_sub::AGE.max()])
            .filter(member_sub::TEAM_ID.eq_column(member::TEAM_ID));
        let q = SelectQuery::new(member::TABLE)
            .select([member::USERNAME.select()])
            .filter(member::AGE.eq_query(oldest_in_team))
            .order_by(member::ID.asc());
        let (rows, _) = select(&data, &q).unwrap();
        assert_eq!(usernames(&rows), vec!["member2", "member3", "member4"]);
    }

    #[test]
    fn test_in_subquery_and_empty_scalar() {
        let data = fixtures::member_team_dataset();
        let q = SelectQuery::new(member::TABLE)
            .select([
                member::USERNAME.select(),
                Expr::subquery(avg_age().filter(member_sub::AGE.gt(100))).as_("none"),
            ])
            .filter(member::AGE.in_query(
                SelectQuery::new(member_sub::TABLE)
                    .select([member_sub::AGE.select()])
                    .filter(member_sub::USERNAME.eq("member3")),
            ))
            .order_by(member::ID.asc());
        let (rows, _) = select(&data, &q).unwrap();
        assert_eq!(usernames(&rows), vec!["member3", "member4"]);
        assert_eq!(rows[0].get("none"), Some(&Value::Null));
    }

    #[test]
    fn test_case_projection() {
        let data = fixtures::member_team_dataset().with(&[fixtures::loner()]);
        let band = CaseBuilder::new()
            .when(member::AGE.between(0, 20))
            .then("0~20")
            .when(member::AGE.between(21, 30))
            .then("21~30")
            .otherwise("other");
        let q = SelectQuery::new(member::TABLE)
            .select([band.as_("band")])
            .order_by(member::ID.asc());
        let (rows, _) = select(&data, &q).unwrap();
        let bands: Vec<_> = rows
            .iter()
            .map(|r| r.get_string("band").unwrap().unwrap_or_default())
            .collect();
        assert_eq!(bands, vec!["21~30", "21~30", "21~30", "21~30", "other"]);
    }

    #[test]
    fn test_delete_by_subquery() {
        let mut data = fixtures::member_team_dataset();
        let deleted = execute(
            &mut data,
            &DeleteQuery::new(member::TABLE)
                .filter(member::AGE.lt_query(avg_age()))
                .into(),
        )
        .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(data.row_count("member"), 3);
    }
}
