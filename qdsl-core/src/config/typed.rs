use super::{ConfigError, QdslConfig};

/// Describes one key of a typed section, for documentation and env hints.
#[derive(Debug, Clone)]
pub struct PropertyMeta {
    /// Relative key (e.g., `"page.max"`).
    pub key: String,
    /// Absolute key (e.g., `"qdsl.data.page.max"`).
    pub full_key: String,
    /// Rust type name (e.g., `"u64"`).
    pub type_name: &'static str,
    /// False once a default is recorded.
    pub required: bool,
    pub default_value: Option<String>,
    pub description: Option<String>,
}

impl PropertyMeta {
    pub fn new(prefix: &str, key: &str, type_name: &'static str) -> Self {
        Self {
            key: key.to_string(),
            full_key: format!("{prefix}.{key}"),
            type_name,
            required: true,
            default_value: None,
            description: None,
        }
    }

    pub fn default_value(mut self, value: impl ToString) -> Self {
        self.required = false;
        self.default_value = Some(value.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Environment variable that overrides this property.
    pub fn env_hint(&self) -> String {
        self.full_key.replace(['.', '-'], "_").to_uppercase()
    }
}

/// A typed section parsed from the keys under [`prefix`](Self::prefix).
///
/// ```ignore
/// impl ConfigProperties for DataConfig {
///     fn prefix() -> &'static str { "qdsl.data" }
///     fn properties_metadata() -> Vec<PropertyMeta> { ... }
///     fn from_config(config: &QdslConfig) -> Result<Self, ConfigError> { ... }
/// }
/// ```
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (e.g., `"qdsl.data"`).
    fn prefix() -> &'static str;

    fn properties_metadata() -> Vec<PropertyMeta>;

    /// Construct from a `QdslConfig` instance.
    fn from_config(config: &QdslConfig) -> Result<Self, ConfigError>;
}
