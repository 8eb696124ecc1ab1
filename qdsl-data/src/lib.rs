//! # qdsl-data
//!
//! Type-safe query composition for the member/team schema.
//!
//! - [`expr`] / [`model`]: typed column paths and the predicate vocabulary.
//! - [`condition`] / [`predicate`]: optional search filters and the fragments
//!   they produce.
//! - [`query`]: select/count/update/delete composition and SQL rendering.
//! - [`page`] / [`pagination`]: paging parameters and the count-skipping rule.
//! - [`projection`] / [`dto`]: result rows and their materialization.
//! - [`engine`]: the execution seam implemented by `qdsl-data-sqlx` and `qdsl-test`.
//! - [`repository`]: member search and bulk operations tying it together.

pub mod condition;
pub mod config;
pub mod dto;
pub mod engine;
pub mod error;
pub mod expr;
pub mod model;
pub mod page;
pub mod pagination;
pub mod predicate;
pub mod projection;
pub mod query;
pub mod repository;

pub use condition::SearchCondition;
pub use config::DataConfig;
pub use dto::{MemberAgeBand, MemberDto, MemberTeamDto, TeamAgeStats, UserDto};
pub use engine::{QueryExecutor, QueryResults, SessionFactory};
pub use error::DataError;
pub use expr::{CaseBuilder, Column, Expr, Predicate, Value};
pub use model::{Entity, Member, Team};
pub use page::{Page, Pageable};
pub use predicate::BooleanBuilder;
pub use projection::{Materialization, Projection, Row};
pub use query::{CountQuery, DeleteQuery, Dialect, Mutation, SelectQuery, SqlStatement, UpdateQuery};
pub use repository::{MemberRepository, MemberSearch};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::model::{member, team};
    pub use crate::{
        DataError, MemberRepository, MemberSearch, MemberTeamDto, Page, Pageable, Predicate,
        QueryExecutor, SearchCondition, SelectQuery, SessionFactory,
    };
}
