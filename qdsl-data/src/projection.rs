//! Result rows and their materialization into typed shapes.

use crate::error::DataError;
use crate::expr::{SelectItem, Value};

/// One result row: values in projection order, addressed by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<L: Into<String>>(pairs: impl IntoIterator<Item = (L, Value)>) -> Self {
        Self {
            columns: pairs.into_iter().map(|(l, v)| (l.into(), v)).collect(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, value: Value) {
        self.columns.push((label.into(), value));
    }

    /// Remove and return the column under `label`.
    pub fn take(&mut self, label: &str) -> Option<Value> {
        let idx = self.columns.iter().position(|(l, _)| l == label)?;
        Some(self.columns.remove(idx).1)
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(l, _)| l.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Absent and NULL both read as `None`.
    fn present(&self, label: &str) -> Option<&Value> {
        self.get(label).filter(|v| !v.is_null())
    }

    pub fn get_i64(&self, label: &str) -> Result<Option<i64>, DataError> {
        self.present(label)
            .map(|v| v.as_i64().ok_or_else(|| mismatch(label, "integer", v)))
            .transpose()
    }

    pub fn get_i32(&self, label: &str) -> Result<Option<i32>, DataError> {
        self.get_i64(label)?
            .map(|v| {
                i32::try_from(v)
                    .map_err(|_| DataError::Mapping(format!("column `{label}`: {v} overflows i32")))
            })
            .transpose()
    }

    pub fn get_f64(&self, label: &str) -> Result<Option<f64>, DataError> {
        self.present(label)
            .map(|v| v.as_f64().ok_or_else(|| mismatch(label, "number", v)))
            .transpose()
    }

    pub fn get_string(&self, label: &str) -> Result<Option<String>, DataError> {
        self.present(label)
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| mismatch(label, "text", v))
            })
            .transpose()
    }

    pub fn require_i64(&self, label: &str) -> Result<i64, DataError> {
        self.get_i64(label)?.ok_or_else(|| missing(label))
    }

    pub fn require_i32(&self, label: &str) -> Result<i32, DataError> {
        self.get_i32(label)?.ok_or_else(|| missing(label))
    }

    pub fn require_f64(&self, label: &str) -> Result<f64, DataError> {
        self.get_f64(label)?.ok_or_else(|| missing(label))
    }

    pub fn require_string(&self, label: &str) -> Result<String, DataError> {
        self.get_string(label)?.ok_or_else(|| missing(label))
    }
}

fn missing(label: &str) -> DataError {
    DataError::Mapping(format!("required column `{label}` is missing or NULL"))
}

fn mismatch(label: &str, expected: &str, got: &Value) -> DataError {
    DataError::Mapping(format!("column `{label}`: expected {expected}, got {got}"))
}

/// How a row is turned into an output value.
///
/// All strategies produce the same result; they differ only in how the value
/// is assembled (struct literal, default-then-setters, or constructor call).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Materialization {
    #[default]
    Fields,
    Setters,
    Constructor,
}

impl std::str::FromStr for Materialization {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fields" => Ok(Materialization::Fields),
            "setters" | "bean" => Ok(Materialization::Setters),
            "constructor" => Ok(Materialization::Constructor),
            other => Err(DataError::Other(format!("unknown materialization `{other}`"))),
        }
    }
}

/// A shape a query can be projected into.
pub trait Projection: Sized + Send + 'static {
    /// Select items, labelled with the names `materialize` reads back.
    fn projection() -> Vec<SelectItem>;

    fn materialize(row: &Row, strategy: Materialization) -> Result<Self, DataError>;
}

pub fn materialize_all<P: Projection>(
    rows: &[Row],
    strategy: Materialization,
) -> Result<Vec<P>, DataError> {
    rows.iter().map(|row| P::materialize(row, strategy)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::from_pairs([
            ("member_id", Value::Int(1)),
            ("username", Value::from("member1")),
            ("team_name", Value::Null),
            ("avg_age", Value::Float(22.5)),
        ])
    }

    #[test]
    fn test_optional_columns() {
        let row = row();
        assert_eq!(row.get_string("username").unwrap().as_deref(), Some("member1"));
        assert_eq!(row.get_string("team_name").unwrap(), None);
        assert_eq!(row.get_i64("team_id").unwrap(), None);
    }

    #[test]
    fn test_required_column_missing() {
        let err = row().require_string("team_name").unwrap_err();
        assert!(matches!(err, DataError::Mapping(_)));
    }

    #[test]
    fn test_type_mismatch() {
        let err = row().get_i64("username").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Row mapping error: column `username`: expected integer, got 'member1'"
        );
    }

    #[test]
    fn test_i32_overflow() {
        let row = Row::from_pairs([("age", Value::Int(i64::MAX))]);
        assert!(row.get_i32("age").is_err());
    }

    #[test]
    fn test_take() {
        let mut row = row();
        assert_eq!(row.take("avg_age"), Some(Value::Float(22.5)));
        assert_eq!(row.len(), 3);
        assert!(row.take("avg_age").is_none());
    }

    #[test]
    fn test_parse_materialization() {
        assert_eq!("bean".parse::<Materialization>().unwrap(), Materialization::Setters);
        assert!("reflection".parse::<Materialization>().is_err());
    }
}
