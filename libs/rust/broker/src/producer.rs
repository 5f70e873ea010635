//! Synchronous-ack producer.

use crate::{BrokerDriver, BrokerError, BrokerRecord};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, instrument};

/// Sends records to one topic, waiting for the broker's ack on each.
#[derive(Clone)]
pub struct Producer {
    driver: Arc<dyn BrokerDriver>,
    topic: String,
}

impl Producer {
    /// A producer for `topic` on `driver`.
    #[must_use]
    pub fn new(driver: Arc<dyn BrokerDriver>, topic: impl Into<String>) -> Self {
        Self {
            driver,
            topic: topic.into(),
        }
    }

    /// Topic this producer writes to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Send `payload` and wait until the broker accepted or rejected it.
    ///
    /// The payload is sent as given, without re-encoding.
    ///
    /// # Errors
    ///
    /// Returns the driver's delivery error unchanged, or
    /// [`BrokerError::ClientClosed`] if the driver dropped the record
    /// without reporting.
    #[instrument(skip(self, payload), fields(topic = %self.topic, bytes = payload.len()))]
    pub async fn send_message(&self, payload: &[u8]) -> Result<(), BrokerError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let record = BrokerRecord::new(self.topic.clone(), payload.to_vec());

        self.driver.produce(
            record,
            Box::new(move |result| {
                // receiver gone means the caller stopped waiting
                let _ = ack_tx.send(result);
            }),
        );

        let result = ack_rx.await.unwrap_or(Err(BrokerError::ClientClosed));
        match &result {
            Ok(()) => debug!("Record acknowledged"),
            Err(e) => error!(error = %e, "Failed to produce record"),
        }
        result
    }
}
