//! The canonical member/team data set.
//!
//! | member  | age | team  |
//! |---------|-----|-------|
//! | member1 | 21  | teamA |
//! | member2 | 25  | teamA |
//! | member3 | 24  | teamB |
//! | member4 | 24  | teamB |

use qdsl_data::{Member, Team};

use crate::dataset::Dataset;

pub fn team_a() -> Team {
    Team::new(1, "teamA")
}

pub fn team_b() -> Team {
    Team::new(2, "teamB")
}

pub fn teams() -> Vec<Team> {
    vec![team_a(), team_b()]
}

pub fn members() -> Vec<Member> {
    let (a, b) = (team_a(), team_b());
    vec![
        Member::new(1, "member1", 21, Some(&a)),
        Member::new(2, "member2", 25, Some(&a)),
        Member::new(3, "member3", 24, Some(&b)),
        Member::new(4, "member4", 24, Some(&b)),
    ]
}

/// A member outside every team.
pub fn loner() -> Member {
    Member::new(5, "loner", 40, None)
}

pub fn member_team_dataset() -> Dataset {
    Dataset::new().with(&teams()).with(&members())
}
