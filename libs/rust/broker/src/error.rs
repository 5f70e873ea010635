//! Broker client errors.

use thiserror::Error;

/// Errors raised by the broker client and its drivers.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The client was closed; the sole clean termination signal for a poll loop
    #[error("broker client closed")]
    ClientClosed,

    /// Invalid broker configuration
    #[error("broker configuration error: {0}")]
    Config(String),

    /// The broker rejected or failed to deliver a record
    #[error("produce failed: {0}")]
    Produce(String),

    /// A poll returned an error
    #[error("poll failed: {0}")]
    Poll(String),

    /// Committing consumed offsets failed
    #[error("offset commit failed: {0}")]
    Commit(String),

    /// Topic administration failed
    #[error("topic {topic}: {reason}")]
    Topic {
        /// Topic name
        topic: String,
        /// Broker-reported reason
        reason: String,
    },

    /// Error reported by the Kafka client library
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

impl BrokerError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error means the client was closed.
    #[must_use]
    pub const fn is_client_closed(&self) -> bool {
        matches!(self, Self::ClientClosed)
    }
}
