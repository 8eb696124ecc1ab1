use std::str::FromStr;

use super::ConfigError;

/// A scalar configuration value, from YAML or the environment.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl ConfigValue {
    pub(crate) fn from_scalar(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;
        match value {
            Yaml::Bool(b) => ConfigValue::Bool(*b),
            Yaml::Number(n) => n
                .as_i64()
                .map(ConfigValue::Integer)
                .or_else(|| n.as_f64().map(ConfigValue::Float))
                .unwrap_or_else(|| ConfigValue::String(n.to_string())),
            Yaml::String(s) => ConfigValue::String(s.clone()),
            Yaml::Null => ConfigValue::Null,
            Yaml::Sequence(_) | Yaml::Mapping(_) | Yaml::Tagged(_) => {
                ConfigValue::String(format!("{value:?}"))
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "string",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Null => "null",
        }
    }
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Integer(i) => write!(f, "{i}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Null => f.write_str("null"),
        }
    }
}

/// Conversion out of a [`ConfigValue`].
///
/// Environment overrides arrive as strings, so scalar conversions parse
/// string values as well.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be read from configuration",
    note = "supported: String, bool, f64, the integer types and Option<T> of those"
)]
pub trait FromConfigValue: Sized {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError>;
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

fn parse<T: FromStr>(raw: &str, key: &str, expected: &'static str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| mismatch(key, expected))
}

impl FromConfigValue for String {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Null => Err(mismatch(key, "string")),
            other => Ok(other.to_string()),
        }
    }
}

impl FromConfigValue for bool {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Bool(b) => Ok(*b),
            ConfigValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(mismatch(key, "bool")),
            },
            _ => Err(mismatch(key, "bool")),
        }
    }
}

impl FromConfigValue for f64 {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Float(x) => Ok(*x),
            ConfigValue::Integer(i) => Ok(*i as f64),
            ConfigValue::String(s) => parse(s, key, "f64"),
            _ => Err(mismatch(key, "f64")),
        }
    }
}

impl<T: FromConfigValue> FromConfigValue for Option<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Null => Ok(None),
            present => T::from_config_value(present, key).map(Some),
        }
    }
}

macro_rules! integer_config_value {
    ($($ty:ty),+) => {$(
        impl FromConfigValue for $ty {
            fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
                match value {
                    ConfigValue::Integer(i) => {
                        <$ty>::try_from(*i).map_err(|_| mismatch(key, stringify!($ty)))
                    }
                    ConfigValue::String(s) => parse(s, key, stringify!($ty)),
                    other => {
                        tracing::trace!(key, found = other.kind(), "config type mismatch");
                        Err(mismatch(key, stringify!($ty)))
                    }
                }
            }
        }
    )+};
}

integer_config_value!(i32, i64, u16, u32, u64, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_from_env_parse() {
        let v = ConfigValue::String(" 42 ".into());
        assert_eq!(u64::from_config_value(&v, "k").unwrap(), 42);
        assert_eq!(i32::from_config_value(&v, "k").unwrap(), 42);
        assert!(bool::from_config_value(&ConfigValue::String("Yes".into()), "k").unwrap());
    }

    #[test]
    fn test_negative_into_unsigned_is_mismatch() {
        let err = u64::from_config_value(&ConfigValue::Integer(-1), "qdsl.data.page.max").unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { expected: "u64", .. }));
    }

    #[test]
    fn test_null_is_none() {
        let v: Option<u32> = FromConfigValue::from_config_value(&ConfigValue::Null, "k").unwrap();
        assert_eq!(v, None);
        assert!(String::from_config_value(&ConfigValue::Null, "k").is_err());
    }
}
