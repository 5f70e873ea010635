//! Broker connection configuration.
//!
//! [`BrokerConfig`] is validated before any driver is built; a malformed
//! bootstrap address is a startup error, never a runtime one.

use crate::BrokerError;
use rdkafka::config::{ClientConfig, RDKafkaLogLevel};
use std::time::Duration;

/// Topic the client produces to or consumes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfig {
    /// Topic name
    pub name: String,
    /// Partitions to create the topic with
    pub partition_count: i32,
    /// Replication factor to create the topic with
    pub replica_count: i32,
}

impl TopicConfig {
    /// A single-partition, single-replica topic.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_count: 1,
            replica_count: 1,
        }
    }

    /// Set the partition count.
    #[must_use]
    pub const fn with_partitions(mut self, count: i32) -> Self {
        self.partition_count = count;
        self
    }

    /// Set the replication factor.
    #[must_use]
    pub const fn with_replicas(mut self, count: i32) -> Self {
        self.replica_count = count;
        self
    }
}

/// Broker client configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Seed brokers as `host:port`
    pub bootstrap_servers: Vec<String>,
    /// `plaintext`, `ssl`, `sasl_plaintext` or `sasl_ssl`
    pub security_protocol: String,
    /// Client private key for mutual TLS
    pub ssl_key_location: Option<String>,
    /// Client certificate for mutual TLS
    pub ssl_certificate_location: Option<String>,
    /// Consumer group id
    pub group_id: String,
    /// `earliest` or `latest`
    pub auto_offset_reset: String,
    /// Producer batching delay
    pub linger_ms: u32,
    /// Producer batch size in bytes
    pub batch_size: u32,
    /// Client library log level (`debug`, `info`, `warn`, `error`)
    pub log_level: Option<String>,
    /// Upper bound on one poll before it returns an empty batch
    pub poll_timeout: Duration,
    /// Upper bound on one produce before it fails
    pub produce_timeout: Duration,
    /// Maximum records returned by one poll
    pub max_poll_records: usize,
    /// Topic settings
    pub topic: TopicConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: vec!["localhost:9092".to_string()],
            security_protocol: "plaintext".to_string(),
            ssl_key_location: None,
            ssl_certificate_location: None,
            group_id: String::new(),
            auto_offset_reset: "earliest".to_string(),
            linger_ms: 5,
            batch_size: 16_384,
            log_level: None,
            poll_timeout: Duration::from_secs(1),
            produce_timeout: Duration::from_secs(10),
            max_poll_records: 500,
            topic: TopicConfig::new(""),
        }
    }
}

impl BrokerConfig {
    /// Configuration for a comma-separated bootstrap list.
    #[must_use]
    pub fn new(bootstrap_servers: &str) -> Self {
        Self {
            bootstrap_servers: split_servers(bootstrap_servers),
            ..Self::default()
        }
    }

    /// Set the consumer group id.
    #[must_use]
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    /// Set the security protocol.
    #[must_use]
    pub fn with_security_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.security_protocol = protocol.into();
        self
    }

    /// Set client key and certificate for mutual TLS.
    #[must_use]
    pub fn with_ssl(mut self, key_location: impl Into<String>, certificate_location: impl Into<String>) -> Self {
        self.ssl_key_location = Some(key_location.into());
        self.ssl_certificate_location = Some(certificate_location.into());
        self
    }

    /// Set where a new consumer group starts reading.
    #[must_use]
    pub fn with_auto_offset_reset(mut self, reset: impl Into<String>) -> Self {
        self.auto_offset_reset = reset.into();
        self
    }

    /// Set the poll timeout.
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the produce timeout.
    #[must_use]
    pub const fn with_produce_timeout(mut self, timeout: Duration) -> Self {
        self.produce_timeout = timeout;
        self
    }

    /// Set the client library log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Set the topic.
    #[must_use]
    pub fn with_topic(mut self, topic: TopicConfig) -> Self {
        self.topic = topic;
        self
    }

    /// Check the configuration for errors a broker would only report later.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.bootstrap_servers.is_empty() {
            return Err(BrokerError::config("bootstrap servers must not be empty"));
        }
        for server in &self.bootstrap_servers {
            validate_server(server)?;
        }

        match self.security_protocol.to_ascii_lowercase().as_str() {
            "plaintext" | "ssl" | "sasl_plaintext" | "sasl_ssl" => {}
            other => {
                return Err(BrokerError::config(format!("unknown security protocol: {other}")));
            }
        }

        match self.auto_offset_reset.as_str() {
            "earliest" | "latest" => {}
            other => return Err(BrokerError::config(format!("invalid auto offset reset: {other}"))),
        }

        if let Some(level) = &self.log_level {
            parse_log_level(level)?;
        }

        if self.max_poll_records == 0 {
            return Err(BrokerError::config("max poll records must be positive"));
        }

        Ok(())
    }

    /// Settings shared by producers and consumers.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.bootstrap_servers.join(","))
            .set("security.protocol", self.security_protocol.to_ascii_lowercase());

        if let Some(key) = &self.ssl_key_location {
            config.set("ssl.key.location", key);
        }
        if let Some(cert) = &self.ssl_certificate_location {
            config.set("ssl.certificate.location", cert);
        }
        if let Some(level) = self.log_level.as_deref().and_then(|l| parse_log_level(l).ok()) {
            config.set_log_level(level);
        }

        config
    }

    /// Producer settings.
    #[must_use]
    pub fn producer_config(&self) -> ClientConfig {
        let mut config = self.client_config();
        config
            .set("acks", "all")
            .set("linger.ms", self.linger_ms.to_string())
            .set("batch.size", self.batch_size.to_string())
            .set("message.timeout.ms", self.produce_timeout.as_millis().to_string());
        config
    }

    /// Consumer settings. Offsets are committed explicitly after each batch.
    #[must_use]
    pub fn consumer_config(&self) -> ClientConfig {
        let mut config = self.client_config();
        config
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("allow.auto.create.topics", "true")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "3000");
        config
    }
}

fn split_servers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn validate_server(server: &str) -> Result<(), BrokerError> {
    let (host, port) = server
        .rsplit_once(':')
        .ok_or_else(|| BrokerError::config(format!("bootstrap server {server:?} is not host:port")))?;

    if host.is_empty() {
        return Err(BrokerError::config(format!("bootstrap server {server:?} has no host")));
    }
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(BrokerError::config(format!("bootstrap server {server:?} has invalid port"))),
    }
}

fn parse_log_level(level: &str) -> Result<RDKafkaLogLevel, BrokerError> {
    match level.to_ascii_lowercase().as_str() {
        "debug" => Ok(RDKafkaLogLevel::Debug),
        "info" => Ok(RDKafkaLogLevel::Info),
        "warn" | "warning" => Ok(RDKafkaLogLevel::Warning),
        "error" => Ok(RDKafkaLogLevel::Error),
        other => Err(BrokerError::config(format!("unknown log level: {other}"))),
    }
}
