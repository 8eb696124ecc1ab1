//! Test utilities for qdsl: an in-memory [`SessionFactory`](qdsl_data::SessionFactory)
//! that counts every call, and the member/team fixtures.

mod dataset;
mod engine;
mod eval;
pub mod fixtures;

pub use dataset::{Dataset, Table};
pub use engine::{CallCounters, CallSnapshot, InMemoryEngine, InMemorySession};
pub use eval::EngineError;
