//! Tracing subscriber installation.

use std::str::FromStr;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{ConfigError, QdslConfig};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,qdsl_data=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

impl LogFormat {
    /// Read `qdsl.logging.format` from the config, defaulting to `Pretty`.
    pub fn from_config<T>(config: &QdslConfig<T>) -> Result<Self, ConfigError> {
        let raw: String = config.get_or("qdsl.logging.format", "pretty".to_string())?;
        raw.parse().map_err(|_| ConfigError::TypeMismatch {
            key: "qdsl.logging.format".to_string(),
            expected: "pretty | json",
        })
    }
}

/// Install the global `tracing` subscriber.
///
/// Honors `RUST_LOG`, falling back to [`DEFAULT_FILTER`]. Calling it again
/// after a subscriber is installed is a no-op.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(format, filter);
}

/// Install the global subscriber with an explicit filter directive,
/// ignoring `RUST_LOG`.
pub fn init_tracing_with_filter(format: LogFormat, directive: &str) {
    install(format, EnvFilter::new(directive));
}

fn install(format: LogFormat, filter: EnvFilter) {
    let installed = match format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE);
            Registry::default().with(filter).with(fmt_layer).try_init()
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE);
            Registry::default().with(filter).with(fmt_layer).try_init()
        }
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_format_from_config() {
        let config = QdslConfig::from_yaml_str("qdsl:\n  logging:\n    format: json\n", "test").unwrap();
        assert_eq!(LogFormat::from_config(&config).unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_config(&QdslConfig::empty()).unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing_with_filter(LogFormat::Pretty, "warn");
        init_tracing_with_filter(LogFormat::Json, "warn");
    }
}
