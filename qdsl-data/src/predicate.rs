//! Search condition to predicate fragments.
//!
//! Two composition styles build the same filter:
//!
//! - list style: [`search_predicates`] yields one `Option` per field, in the
//!   fixed order username, team name, age lower bound, age upper bound, and
//!   [`where_all`] keeps the present ones.
//! - builder style: [`search_builder`] accumulates the same fragments into a
//!   [`BooleanBuilder`].
//!
//! A composed query splits a top-level `AND` back into its parts, so both
//! styles render identical SQL.

use crate::condition::{has_text, SearchCondition};
use crate::expr::Predicate;
use crate::model::{member, team};

pub fn username_eq(username: Option<&str>) -> Option<Predicate> {
    username
        .filter(|u| has_text(Some(*u)))
        .map(|u| member::USERNAME.eq(u))
}

pub fn team_name_eq(team_name: Option<&str>) -> Option<Predicate> {
    team_name
        .filter(|t| has_text(Some(*t)))
        .map(|t| team::NAME.eq(t))
}

pub fn age_goe(age: Option<i32>) -> Option<Predicate> {
    age.map(|a| member::AGE.goe(a))
}

pub fn age_loe(age: Option<i32>) -> Option<Predicate> {
    age.map(|a| member::AGE.loe(a))
}

pub fn search_predicates(condition: &SearchCondition) -> [Option<Predicate>; 4] {
    [
        username_eq(condition.username.as_deref()),
        team_name_eq(condition.team_name.as_deref()),
        age_goe(condition.age_goe),
        age_loe(condition.age_loe),
    ]
}

/// Keep the present fragments. An empty result matches every row.
pub fn where_all(fragments: impl IntoIterator<Item = Option<Predicate>>) -> Vec<Predicate> {
    fragments.into_iter().flatten().collect()
}

/// Mutable accumulator for a boolean expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BooleanBuilder {
    predicate: Option<Predicate>,
}

impl BooleanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(&mut self, predicate: Predicate) -> &mut Self {
        self.predicate = Some(match self.predicate.take() {
            Some(current) => current.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn and_opt(&mut self, predicate: Option<Predicate>) -> &mut Self {
        if let Some(p) = predicate {
            self.and(p);
        }
        self
    }

    pub fn or(&mut self, predicate: Predicate) -> &mut Self {
        self.predicate = Some(match self.predicate.take() {
            Some(current) => current.or(predicate),
            None => predicate,
        });
        self
    }

    /// Negate what has been accumulated so far. No-op when empty.
    pub fn not(&mut self) -> &mut Self {
        self.predicate = self.predicate.take().map(Predicate::not);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicate.is_none()
    }

    pub fn value(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn into_predicate(self) -> Option<Predicate> {
        self.predicate
    }
}

pub fn search_builder(condition: &SearchCondition) -> BooleanBuilder {
    let mut builder = BooleanBuilder::new();
    for fragment in search_predicates(condition) {
        builder.and_opt(fragment);
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Value;

    #[test]
    fn test_empty_condition_yields_nothing() {
        let c = SearchCondition::new();
        assert!(where_all(search_predicates(&c)).is_empty());
        assert!(search_builder(&c).is_empty());
    }

    #[test]
    fn test_blank_strings_yield_nothing() {
        let c = SearchCondition::new().username("  ").team_name("\t");
        assert!(where_all(search_predicates(&c)).is_empty());
    }

    #[test]
    fn test_fragment_order() {
        let c = SearchCondition::new()
            .age_loe(40)
            .age_goe(10)
            .team_name("teamB")
            .username("member3");
        let fragments = where_all(search_predicates(&c));
        assert_eq!(
            fragments,
            vec![
                member::USERNAME.eq("member3"),
                team::NAME.eq("teamB"),
                member::AGE.goe(10),
                member::AGE.loe(40),
            ]
        );
    }

    #[test]
    fn test_builder_matches_list() {
        let c = SearchCondition::new().team_name("teamA").age_goe(15).age_loe(23);
        let from_builder = search_builder(&c).into_predicate().unwrap().into_conjuncts();
        assert_eq!(from_builder, where_all(search_predicates(&c)));
    }

    #[test]
    fn test_username_keeps_raw_value() {
        assert_eq!(
            username_eq(Some(" member1 ")),
            Some(Predicate::Compare {
                column: member::USERNAME.column_ref(),
                op: crate::expr::CompareOp::Eq,
                value: Value::from(" member1 "),
            })
        );
    }

    #[test]
    fn test_builder_or_and_not() {
        let mut b = BooleanBuilder::new();
        b.not();
        assert!(b.is_empty());
        b.and(member::AGE.lt(20)).or(member::AGE.gt(30)).not();
        assert_eq!(
            b.value(),
            Some(&member::AGE.lt(20).or(member::AGE.gt(30)).not())
        );
    }
}
