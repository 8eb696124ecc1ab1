use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Optional member search filters. Every absent field means "no constraint".
///
/// Binds from query-string shaped input:
///
/// ```ignore
/// let c: SearchCondition = serde_json::from_str(r#"{"teamName":"teamA","ageGoe":15}"#)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCondition {
    pub username: Option<String>,
    pub team_name: Option<String>,
    pub age_goe: Option<i32>,
    pub age_loe: Option<i32>,
}

impl SearchCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn team_name(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = Some(team_name.into());
        self
    }

    pub fn age_goe(mut self, age: i32) -> Self {
        self.age_goe = Some(age);
        self
    }

    pub fn age_loe(mut self, age: i32) -> Self {
        self.age_loe = Some(age);
        self
    }

    /// True when no field would constrain the search.
    pub fn is_unconstrained(&self) -> bool {
        !has_text(self.username.as_deref())
            && !has_text(self.team_name.as_deref())
            && self.age_goe.is_none()
            && self.age_loe.is_none()
    }

    /// Reject an inverted age range.
    pub fn validate(&self) -> Result<(), DataError> {
        match (self.age_goe, self.age_loe) {
            (Some(goe), Some(loe)) if goe > loe => Err(DataError::InvalidCondition(format!(
                "ageGoe ({goe}) is greater than ageLoe ({loe})"
            ))),
            _ => Ok(()),
        }
    }
}

/// Present and not blank.
pub fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}
