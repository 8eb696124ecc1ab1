//! # qdsl-core
//!
//! Ambient runtime pieces shared by the qdsl crates:
//!
//! - [`config`]: layered configuration (`application.yaml`, profile overrides,
//!   `.env` files, environment variables) with typed sections.
//! - [`logging`]: `tracing` subscriber installation.

pub mod config;
pub mod logging;

pub use config::{
    ConfigError, ConfigProperties, ConfigValidationDetail, ConfigValue, FromConfigValue,
    PropertyMeta, QdslConfig,
};
pub use logging::{init_tracing, init_tracing_with_filter, LogFormat};

pub mod prelude {
    //! Re-exports of the most commonly used core types.
    pub use crate::{init_tracing, ConfigError, ConfigProperties, LogFormat, QdslConfig};
}
