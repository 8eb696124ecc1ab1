use qdsl_core::config::{ConfigError, ConfigProperties, ConfigValidationDetail, PropertyMeta, QdslConfig};

use crate::page::DEFAULT_PAGE_SIZE;
use crate::projection::Materialization;
use crate::query::Dialect;

pub const DEFAULT_MAX_PAGE_SIZE: u64 = 2000;

/// Typed `qdsl.data` section.
///
/// ```yaml
/// qdsl:
///   data:
///     url: "sqlite::memory:"
///     dialect: sqlite
///     materialization: fields
///     page:
///       default: 20
///       max: 2000
///     pool:
///       size: 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConfig {
    pub url: String,
    pub dialect: Dialect,
    pub materialization: Materialization,
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub pool_size: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            dialect: Dialect::Sqlite,
            materialization: Materialization::Fields,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            pool_size: 5,
        }
    }
}

impl ConfigProperties for DataConfig {
    fn prefix() -> &'static str {
        "qdsl.data"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        let p = Self::prefix();
        vec![
            PropertyMeta::new(p, "url", "String")
                .default_value("sqlite::memory:")
                .description("Database connection URL"),
            PropertyMeta::new(p, "dialect", "Dialect")
                .default_value("sqlite")
                .description("SQL dialect used to render queries"),
            PropertyMeta::new(p, "materialization", "Materialization").default_value("fields"),
            PropertyMeta::new(p, "page.default", "u64").default_value(DEFAULT_PAGE_SIZE),
            PropertyMeta::new(p, "page.max", "u64")
                .default_value(DEFAULT_MAX_PAGE_SIZE)
                .description("Largest accepted page size"),
            PropertyMeta::new(p, "pool.size", "u32").default_value(5),
        ]
    }

    fn from_config(config: &QdslConfig) -> Result<Self, ConfigError> {
        let defaults = DataConfig::default();
        let key = |k: &str| format!("{}.{k}", Self::prefix());

        let dialect_key = key("dialect");
        let dialect = match config.get::<String>(&dialect_key) {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::TypeMismatch {
                key: dialect_key.clone(),
                expected: "generic | sqlite | mysql | postgres",
            })?,
            Err(ConfigError::NotFound(_)) => defaults.dialect,
            Err(e) => return Err(e),
        };

        let materialization_key = key("materialization");
        let materialization = match config.get::<String>(&materialization_key) {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::TypeMismatch {
                key: materialization_key.clone(),
                expected: "fields | setters | constructor",
            })?,
            Err(ConfigError::NotFound(_)) => defaults.materialization,
            Err(e) => return Err(e),
        };

        let data = DataConfig {
            url: config.get_or(&key("url"), defaults.url)?,
            dialect,
            materialization,
            default_page_size: config.get_or(&key("page.default"), defaults.default_page_size)?,
            max_page_size: config.get_or(&key("page.max"), defaults.max_page_size)?,
            pool_size: config.get_or(&key("pool.size"), defaults.pool_size)?,
        };
        data.validate()?;
        Ok(data)
    }
}

impl DataConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if self.default_page_size == 0 {
            errors.push(ConfigValidationDetail::new(
                "qdsl.data.page.default",
                "must be at least 1",
            ));
        }
        if self.max_page_size < self.default_page_size {
            errors.push(ConfigValidationDetail::new(
                "qdsl.data.page.max",
                format!(
                    "must not be smaller than page.default ({})",
                    self.default_page_size
                ),
            ));
        }
        if self.pool_size == 0 {
            errors.push(ConfigValidationDetail::new("qdsl.data.pool.size", "must be at least 1"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_section_missing() {
        let config = DataConfig::from_config(&QdslConfig::empty()).unwrap();
        assert_eq!(config, DataConfig::default());
    }

    #[test]
    fn test_reads_section() {
        let yaml = "qdsl:\n  data:\n    url: sqlite://members.db\n    dialect: postgres\n    materialization: constructor\n    page:\n      default: 10\n      max: 50\n";
        let config = QdslConfig::from_yaml_str(yaml, "test")
            .unwrap()
            .with_typed::<DataConfig>()
            .unwrap();
        assert_eq!(config.url, "sqlite://members.db");
        assert_eq!(config.dialect, Dialect::Postgres);
        assert_eq!(config.materialization, Materialization::Constructor);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.pool_size, 5);
    }

    #[test]
    fn test_validation_collects_errors() {
        let yaml = "qdsl:\n  data:\n    page:\n      default: 0\n    pool:\n      size: 0\n";
        let raw = QdslConfig::from_yaml_str(yaml, "test").unwrap();
        match DataConfig::from_config(&raw) {
            Err(ConfigError::Validation(details)) => assert_eq!(details.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_dialect() {
        let raw = QdslConfig::from_yaml_str("qdsl:\n  data:\n    dialect: oracle\n", "test").unwrap();
        assert!(matches!(
            DataConfig::from_config(&raw),
            Err(ConfigError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_env_hints() {
        let hints: Vec<_> = DataConfig::properties_metadata()
            .iter()
            .map(PropertyMeta::env_hint)
            .collect();
        assert!(hints.contains(&"QDSL_DATA_PAGE_MAX".to_string()));
    }
}
