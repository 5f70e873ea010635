//! Centralized configuration for the forwarder service.
//!
//! All configuration is loaded from environment variables (after reading a
//! `.env` file if present) and validated at startup.

use crate::error::ForwarderError;
use relay_access_token::{AuthConfig, TokenCacheConfig};
use relay_broker::{BrokerConfig, TopicConfig};
use relay_common::env::{EnvVars, parse_value};
use relay_common::{LogFormat, TracingConfig};
use relay_id::NodeId;
use std::time::Duration;
use url::Url;

/// Service name attached to logs.
pub const SERVICE_NAME: &str = "forwarder-service";

/// Forwarder service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment name
    pub environment: String,
    /// Node identity derived from `POD_IP`
    pub node: NodeId,
    /// Logging settings
    pub tracing: TracingConfig,
    /// Broker connection and topic
    pub broker: BrokerConfig,
    /// Client-credentials grant settings
    pub auth: AuthConfig,
    /// Token cache settings
    pub token_cache: TokenCacheConfig,
    /// Base URL of the downstream API
    pub three_url: Url,
    /// Upper bound on graceful shutdown
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ForwarderError> {
        dotenvy::dotenv().ok();
        Self::load(&EnvVars::from_process())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ForwarderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::load(&EnvVars::new(lookup))
    }

    fn load<F>(env: &EnvVars<F>) -> Result<Self, ForwarderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let node = NodeId::from_ipv4(env.env_required("POD_IP")?.trim())?;

        let environment = env.env_or("ENVIRONMENT", "local");
        let tracing = TracingConfig::default()
            .with_service_name(SERVICE_NAME)
            .with_environment(environment.clone())
            .with_log_level(env.env_or("LOG_LEVEL", "info"))
            .with_format(env.parse_env("LOG_FORMAT", LogFormat::Text)?);

        let topic = env.env_required("ONE_REQUEST_TOPIC")?;
        let broker = BrokerConfig::new(&env.env_or("KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"))
            .with_group_id(env.env_or("KAFKA_GROUP_ID", SERVICE_NAME))
            .with_security_protocol(env.env_or("KAFKA_SECURITY_PROTOCOL", "plaintext"))
            .with_auto_offset_reset(env.env_or("KAFKA_AUTO_OFFSET_RESET", "earliest"))
            .with_topic(TopicConfig::new(topic));
        broker.validate()?;

        let auth = AuthConfig::new(
            env.env_required("AUTH_TOKEN_URL")?,
            env.env_required("AUTH_CLIENT_ID")?,
            env.env_required("AUTH_CLIENT_SECRET")?,
        );

        let three_url: Url = parse_value("THREE_URL", &env.env_required("THREE_URL")?)?;
        let shutdown_secs: u64 = env.parse_env("SHUTDOWN_TIMEOUT_SECS", 5)?;

        Ok(Self {
            environment,
            node,
            tracing,
            broker,
            auth,
            token_cache: TokenCacheConfig::default(),
            three_url,
            shutdown_timeout: Duration::from_secs(shutdown_secs),
        })
    }

    /// Name of the inbound topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.broker.topic.name
    }
}
