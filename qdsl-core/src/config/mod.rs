//! Layered configuration.
//!
//! Later layers win:
//!
//! 1. `application.yaml`
//! 2. `application-{profile}.yaml`
//! 3. `.env` then `.env.{profile}`, which only fill variables not already set
//! 4. `QDSL_*` environment variables (`QDSL_DATA_URL` sets `qdsl.data.url`)
//!
//! The profile argument is overridden by `QDSL_PROFILE`.

mod loader;
pub mod typed;
pub mod value;

use std::ops::Deref;
use std::path::Path;

use loader::Values;

pub use typed::{ConfigProperties, PropertyMeta};
pub use value::{ConfigValue, FromConfigValue};

pub const PROFILE_ENV: &str = "QDSL_PROFILE";

/// One rejected property of a typed section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationDetail {
    pub key: String,
    pub message: String,
}

impl ConfigValidationDetail {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    NotFound(String),
    TypeMismatch { key: String, expected: &'static str },
    /// Unreadable file or malformed YAML.
    Load(String),
    Validation(Vec<ConfigValidationDetail>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "missing config key `{key}`"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "config key `{key}` is not a valid {expected}")
            }
            ConfigError::Load(msg) => write!(f, "cannot load configuration: {msg}"),
            ConfigError::Validation(details) => {
                let keys: Vec<&str> = details.iter().map(|d| d.key.as_str()).collect();
                write!(f, "invalid configuration ({})", keys.join(", "))?;
                for detail in details {
                    write!(f, "\n  {}: {}", detail.key, detail.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Flattened key/value configuration for one profile.
///
/// `QdslConfig<()>` answers raw lookups; `QdslConfig<T>` also carries a parsed
/// section reachable through `Deref`.
#[derive(Debug, Clone)]
pub struct QdslConfig<T = ()> {
    values: Values,
    profile: String,
    typed: T,
}

impl QdslConfig {
    /// Load `profile` from the working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."), profile)
    }

    pub fn load_from_dir(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| profile.to_string());

        let mut values = Values::new();
        loader::merge_file(&dir.join("application.yaml"), &mut values)?;
        loader::merge_file(&dir.join(format!("application-{profile}.yaml")), &mut values)?;

        for env_file in [dir.join(".env"), dir.join(format!(".env.{profile}"))] {
            if let Err(e) = dotenvy::from_path(&env_file) {
                if !e.not_found() {
                    return Err(ConfigError::Load(format!("{}: {e}", env_file.display())));
                }
            }
        }
        loader::merge_env(std::env::vars(), &mut values);

        tracing::debug!(%profile, keys = values.len(), "configuration loaded");
        Ok(QdslConfig {
            values,
            profile,
            typed: (),
        })
    }

    /// Single YAML document, no files or environment involved.
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = Values::new();
        loader::merge_str(yaml, &mut values)?;
        Ok(QdslConfig {
            values,
            profile: profile.to_string(),
            typed: (),
        })
    }

    pub fn empty() -> Self {
        QdslConfig {
            values: Values::new(),
            profile: "test".to_string(),
            typed: (),
        }
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Parse section `C` and keep it alongside the raw values.
    ///
    /// ```ignore
    /// let config = QdslConfig::load("dev")?.with_typed::<DataConfig>()?;
    /// let max = config.max_page_size;
    /// ```
    pub fn with_typed<C: ConfigProperties>(self) -> Result<QdslConfig<C>, ConfigError> {
        let typed = C::from_config(&self)?;
        Ok(QdslConfig {
            values: self.values,
            profile: self.profile,
            typed,
        })
    }
}

impl<T> QdslConfig<T> {
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        match self.values.get(key) {
            Some(value) => V::from_config_value(value, key),
            None => Err(ConfigError::NotFound(key.to_string())),
        }
    }

    /// `default` when `key` is absent; a present value of the wrong type is
    /// still an error.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> Result<V, ConfigError> {
        match self.get(key) {
            Err(ConfigError::NotFound(_)) => Ok(default),
            other => other,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn typed(&self) -> &T {
        &self.typed
    }

    /// Copy of the raw values without the typed section.
    pub fn raw(&self) -> QdslConfig {
        QdslConfig {
            values: self.values.clone(),
            profile: self.profile.clone(),
            typed: (),
        }
    }
}

impl<T> Deref for QdslConfig<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.typed
    }
}
