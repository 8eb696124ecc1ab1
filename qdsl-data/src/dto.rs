//! Flattened output shapes.

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::expr::{CaseBuilder, Expr, SelectItem};
use crate::model::{member, member_sub, team};
use crate::query::SelectQuery;
use crate::projection::{Materialization, Projection, Row};

/// One member joined with its (optional) team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTeamDto {
    pub member_id: i64,
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
}

impl MemberTeamDto {
    pub fn new(
        member_id: i64,
        username: Option<String>,
        age: i32,
        team_id: Option<i64>,
        team_name: Option<String>,
    ) -> Self {
        Self {
            member_id,
            username,
            age,
            team_id,
            team_name,
        }
    }

    pub fn set_member_id(&mut self, member_id: i64) {
        self.member_id = member_id;
    }

    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    pub fn set_age(&mut self, age: i32) {
        self.age = age;
    }

    pub fn set_team_id(&mut self, team_id: Option<i64>) {
        self.team_id = team_id;
    }

    pub fn set_team_name(&mut self, team_name: Option<String>) {
        self.team_name = team_name;
    }
}

impl Projection for MemberTeamDto {
    fn projection() -> Vec<SelectItem> {
        vec![
            member::ID.as_("member_id"),
            member::USERNAME.as_("username"),
            member::AGE.as_("age"),
            team::ID.as_("team_id"),
            team::NAME.as_("team_name"),
        ]
    }

    fn materialize(row: &Row, strategy: Materialization) -> Result<Self, DataError> {
        match strategy {
            Materialization::Fields => Ok(MemberTeamDto {
                member_id: row.require_i64("member_id")?,
                username: row.get_string("username")?,
                age: row.require_i32("age")?,
                team_id: row.get_i64("team_id")?,
                team_name: row.get_string("team_name")?,
            }),
            Materialization::Setters => {
                let mut dto = MemberTeamDto::default();
                dto.set_member_id(row.require_i64("member_id")?);
                dto.set_username(row.get_string("username")?);
                dto.set_age(row.require_i32("age")?);
                dto.set_team_id(row.get_i64("team_id")?);
                dto.set_team_name(row.get_string("team_name")?);
                Ok(dto)
            }
            Materialization::Constructor => Ok(MemberTeamDto::new(
                row.require_i64("member_id")?,
                row.get_string("username")?,
                row.require_i32("age")?,
                row.get_i64("team_id")?,
                row.get_string("team_name")?,
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub username: Option<String>,
    pub age: i32,
}

impl Projection for MemberDto {
    fn projection() -> Vec<SelectItem> {
        vec![member::USERNAME.select(), member::AGE.select()]
    }

    fn materialize(row: &Row, _strategy: Materialization) -> Result<Self, DataError> {
        Ok(MemberDto {
            username: row.get_string("username")?,
            age: row.require_i32("age")?,
        })
    }
}

/// Member projected under different names: `username AS name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub name: Option<String>,
    pub age: i32,
}

impl UserDto {
    /// `username AS name` with `age` taken from
    /// `(SELECT MAX(ms.age) FROM member ms)` instead of the member's own age.
    pub fn oldest_age_projection() -> Vec<SelectItem> {
        let oldest = SelectQuery::new(member_sub::TABLE).select([member_sub::AGE.max()]);
        vec![
            member::USERNAME.as_("name"),
            Expr::subquery(oldest).as_("age"),
        ]
    }
}

impl Projection for UserDto {
    fn projection() -> Vec<SelectItem> {
        vec![member::USERNAME.as_("name"), member::AGE.select()]
    }

    fn materialize(row: &Row, _strategy: Materialization) -> Result<Self, DataError> {
        Ok(UserDto {
            name: row.get_string("name")?,
            age: row.require_i32("age")?,
        })
    }
}

/// Username with the age band the member falls in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAgeBand {
    pub username: Option<String>,
    pub band: String,
}

impl MemberAgeBand {
    pub fn band() -> Expr {
        CaseBuilder::new()
            .when(member::AGE.between(0, 20))
            .then("0~20")
            .when(member::AGE.between(21, 30))
            .then("21~30")
            .otherwise("other")
    }
}

impl Projection for MemberAgeBand {
    fn projection() -> Vec<SelectItem> {
        vec![member::USERNAME.select(), Self::band().as_("band")]
    }

    fn materialize(row: &Row, _strategy: Materialization) -> Result<Self, DataError> {
        Ok(MemberAgeBand {
            username: row.get_string("username")?,
            band: row.require_string("band")?,
        })
    }
}

/// Per-team aggregate over the members that have a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAgeStats {
    pub team_name: String,
    pub member_count: i64,
    pub avg_age: f64,
    pub max_age: i32,
}

impl Projection for TeamAgeStats {
    fn projection() -> Vec<SelectItem> {
        vec![
            team::NAME.as_("team_name"),
            member::ID.count().as_("member_count"),
            member::AGE.avg(),
            member::AGE.max(),
        ]
    }

    fn materialize(row: &Row, _strategy: Materialization) -> Result<Self, DataError> {
        Ok(TeamAgeStats {
            team_name: row.require_string("team_name")?,
            member_count: row.require_i64("member_count")?,
            avg_age: row.require_f64("avg_age")?,
            max_age: row.require_i32("max_age")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Value;

    fn row(team: Option<(i64, &str)>) -> Row {
        let (team_id, team_name) = match team {
            Some((id, name)) => (Value::Int(id), Value::from(name)),
            None => (Value::Null, Value::Null),
        };
        Row::from_pairs([
            ("member_id", Value::Int(5)),
            ("username", Value::from("member5")),
            ("age", Value::Int(30)),
            ("team_id", team_id),
            ("team_name", team_name),
        ])
    }

    #[test]
    fn test_strategies_agree() {
        for team in [Some((1, "teamA")), None] {
            let row = row(team);
            let fields = MemberTeamDto::materialize(&row, Materialization::Fields).unwrap();
            let setters = MemberTeamDto::materialize(&row, Materialization::Setters).unwrap();
            let ctor = MemberTeamDto::materialize(&row, Materialization::Constructor).unwrap();
            assert_eq!(fields, setters);
            assert_eq!(fields, ctor);
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let dto = MemberTeamDto::materialize(&row(Some((1, "teamA"))), Materialization::Fields)
            .unwrap();
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["memberId"], 5);
        assert_eq!(json["teamName"], "teamA");
    }

    #[test]
    fn test_missing_required_column() {
        let row = Row::from_pairs([("username", Value::from("x"))]);
        for strategy in [
            Materialization::Fields,
            Materialization::Setters,
            Materialization::Constructor,
        ] {
            assert!(matches!(
                MemberTeamDto::materialize(&row, strategy),
                Err(DataError::Mapping(_))
            ));
        }
    }

    #[test]
    fn test_oldest_age_projection_keeps_labels() {
        let items = UserDto::oldest_age_projection();
        assert_eq!(items[1].label, "age");
        assert!(matches!(items[1].expr, Expr::Subquery(_)));
        assert_eq!(items[1].expr.kind(), crate::expr::ValueKind::Int);
    }

    #[test]
    fn test_user_dto_alias() {
        let items = UserDto::projection();
        assert_eq!(items[0].label, "name");
        let row = Row::from_pairs([("name", Value::from("member1")), ("age", Value::Int(10))]);
        assert_eq!(
            UserDto::materialize(&row, Materialization::Fields).unwrap(),
            UserDto {
                name: Some("member1".into()),
                age: 10
            }
        );
    }
}
