//! Member / Team entities and their typed column paths.

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::expr::{SelectItem, TableRef, Value};
use crate::projection::{Materialization, Projection, Row};

/// A row type backed by one table.
///
/// `values()` must line up with `columns()`.
///
/// # Example
///
/// ```ignore
/// impl Entity for Team {
///     fn table() -> TableRef { team::TABLE }
///     fn columns() -> &'static [&'static str] { &["team_id", "name"] }
///     fn values(&self) -> Vec<Value> { vec![self.id.into(), self.name.clone().into()] }
/// }
/// ```
pub trait Entity: Send + Sync + Unpin + 'static {
    fn table() -> TableRef;
    fn columns() -> &'static [&'static str];
    fn values(&self) -> Vec<Value>;

    fn table_name() -> &'static str {
        Self::table().name
    }
}

/// Typed paths over `member m`.
pub mod member {
    use crate::expr::{Column, TableRef};

    pub const TABLE: TableRef = TableRef::new("member", "m");
    pub const ID: Column<i64> = Column::new("m", "member_id");
    pub const USERNAME: Column<String> = Column::new("m", "username");
    pub const AGE: Column<i32> = Column::new("m", "age");
    pub const TEAM_ID: Column<i64> = Column::new("m", "team_id");
}

/// `member ms`: a second alias over `member`, for subqueries next to an
/// outer `member m`.
pub mod member_sub {
    use crate::expr::{Column, TableRef};

    pub const TABLE: TableRef = TableRef::new("member", "ms");
    pub const ID: Column<i64> = Column::new("ms", "member_id");
    pub const USERNAME: Column<String> = Column::new("ms", "username");
    pub const AGE: Column<i32> = Column::new("ms", "age");
    pub const TEAM_ID: Column<i64> = Column::new("ms", "team_id");
}

/// Typed paths over `team t`.
pub mod team {
    use crate::expr::{Column, TableRef};

    pub const TABLE: TableRef = TableRef::new("team", "t");
    pub const ID: Column<i64> = Column::new("t", "team_id");
    pub const NAME: Column<String> = Column::new("t", "name");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<i64>,
}

impl Member {
    pub fn new(id: i64, username: &str, age: i32, team: Option<&Team>) -> Self {
        Self {
            id,
            username: Some(username.to_string()),
            age,
            team_id: team.map(|t| t.id),
        }
    }
}

impl Entity for Member {
    fn table() -> TableRef {
        member::TABLE
    }

    fn columns() -> &'static [&'static str] {
        &["member_id", "username", "age", "team_id"]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.username.clone().into(),
            self.age.into(),
            self.team_id.into(),
        ]
    }
}

impl Projection for Member {
    fn projection() -> Vec<SelectItem> {
        vec![
            member::ID.select(),
            member::USERNAME.select(),
            member::AGE.select(),
            member::TEAM_ID.select(),
        ]
    }

    fn materialize(row: &Row, _strategy: Materialization) -> Result<Self, DataError> {
        Ok(Member {
            id: row.require_i64("member_id")?,
            username: row.get_string("username")?,
            age: row.require_i32("age")?,
            team_id: row.get_i64("team_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

impl Team {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

impl Entity for Team {
    fn table() -> TableRef {
        team::TABLE
    }

    fn columns() -> &'static [&'static str] {
        &["team_id", "name"]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.into(), self.name.clone().into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_line_up_with_columns() {
        let team = Team::new(1, "teamA");
        let m = Member::new(7, "member1", 21, Some(&team));
        assert_eq!(m.values().len(), Member::columns().len());
        assert_eq!(m.values()[3], Value::Int(1));
        assert_eq!(Member::table_name(), "member");
        assert_eq!(Team::table().alias, "t");
    }

    #[test]
    fn test_member_from_row() {
        let row = Row::from_pairs([
            ("member_id", Value::Int(3)),
            ("username", Value::Null),
            ("age", Value::Int(24)),
        ]);
        let m = Member::materialize(&row, Materialization::Fields).unwrap();
        assert_eq!(
            m,
            Member {
                id: 3,
                username: None,
                age: 24,
                team_id: None
            }
        );
    }
}
