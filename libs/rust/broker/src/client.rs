//! Broker client: one driver shared by producers and consumers.

use crate::{BrokerConfig, BrokerDriver, BrokerError, Consumer, KafkaDriver, Producer};
use std::sync::Arc;

/// A connection to the broker that hands out producers and consumers.
///
/// Closing the client ends every consumer's poll loop.
#[derive(Clone)]
pub struct BrokerClient {
    driver: Arc<dyn BrokerDriver>,
}

impl BrokerClient {
    /// Connect to Kafka.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Config`] if `config` is invalid.
    pub fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        Ok(Self::with_driver(Arc::new(KafkaDriver::new(config)?)))
    }

    /// Wrap an existing driver.
    #[must_use]
    pub fn with_driver(driver: Arc<dyn BrokerDriver>) -> Self {
        Self { driver }
    }

    /// A producer for `topic`.
    #[must_use]
    pub fn producer(&self, topic: impl Into<String>) -> Producer {
        Producer::new(Arc::clone(&self.driver), topic)
    }

    /// A consumer for `topic`, subscribed immediately.
    ///
    /// # Errors
    ///
    /// Returns the driver's subscription error.
    pub fn consumer(&self, topic: impl Into<String>) -> Result<Consumer, BrokerError> {
        Consumer::new(Arc::clone(&self.driver), topic)
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) {
        self.driver.close();
    }

    /// The underlying driver.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn BrokerDriver> {
        &self.driver
    }
}
