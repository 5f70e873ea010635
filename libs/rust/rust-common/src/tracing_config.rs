//! Structured logging setup.

use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const FALLBACK_LEVEL: &str = "info";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines, for local runs
    #[default]
    Text,
    /// One JSON object per line, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}, expected text or json")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

/// Logging configuration for a service.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name, attached to the startup event
    pub service_name: String,
    /// Deployment environment, attached to the startup event
    pub environment: Option<String>,
    /// Filter directive used when `RUST_LOG` is unset (e.g. `info` or
    /// `relay_broker=debug,info`)
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "relay-service".to_string(),
            environment: None,
            log_level: FALLBACK_LEVEL.to_string(),
            format: LogFormat::Text,
        }
    }
}

impl TracingConfig {
    /// Set the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Set the deployment environment.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Set the filter directive.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// `RUST_LOG` if set and valid, else the configured directive, else
    /// `info`. The flag reports whether the configured directive was
    /// rejected.
    fn filter(&self) -> (EnvFilter, bool) {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return (filter, false);
        }
        match EnvFilter::try_new(&self.log_level) {
            Ok(filter) => (filter, false),
            Err(_) => (EnvFilter::new(FALLBACK_LEVEL), true),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// Returns `false` if a subscriber was already installed, in which case
/// nothing changes.
pub fn init_tracing(config: &TracingConfig) -> bool {
    let (filter, rejected) = config.filter();

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    }
    .is_ok();

    if installed {
        if rejected {
            tracing::warn!(level = %config.log_level, "Invalid log level, using {FALLBACK_LEVEL}");
        }
        tracing::info!(
            service = %config.service_name,
            environment = config.environment.as_deref().unwrap_or("unknown"),
            format = %config.format,
            "Tracing initialized"
        );
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" text ".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = TracingConfig::default()
            .with_service_name("forwarder")
            .with_environment("staging")
            .with_log_level("debug")
            .with_format(LogFormat::Json);

        assert_eq!(config.service_name, "forwarder");
        assert_eq!(config.environment.as_deref(), Some("staging"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_second_init_is_ignored() {
        let config = TracingConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
