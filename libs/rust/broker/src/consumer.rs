//! At-least-once polling consumer.

use crate::{BrokerDriver, BrokerError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Processes one consumed record.
#[async_trait]
pub trait ConsumerHandler: Send + Sync {
    /// Handle `payload` read from `topic`.
    ///
    /// Errors are logged by the poll loop and do not cause redelivery.
    async fn handle(&self, payload: &[u8], topic: &str) -> anyhow::Result<()>;
}

/// Polls one topic and feeds its records to a handler.
#[derive(Clone)]
pub struct Consumer {
    driver: Arc<dyn BrokerDriver>,
    topic: String,
}

impl Consumer {
    /// Subscribe `driver` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns the driver's subscription error.
    pub fn new(driver: Arc<dyn BrokerDriver>, topic: impl Into<String>) -> Result<Self, BrokerError> {
        let topic = topic.into();
        driver.subscribe(&topic)?;
        Ok(Self { driver, topic })
    }

    /// Topic this consumer reads.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Run the poll loop on a background task and return immediately.
    ///
    /// Each cycle polls one batch, hands every record of this consumer's
    /// topic to `handler` in broker order and then commits offsets. The
    /// loop ends only when the client is closed.
    pub fn start(&self, handler: Arc<dyn ConsumerHandler>) -> JoinHandle<()> {
        let driver = Arc::clone(&self.driver);
        let topic = self.topic.clone();

        tokio::spawn(async move {
            info!(topic = %topic, "Consumer started");
            loop {
                let fetches = driver.poll_fetches().await;
                if fetches.is_client_closed() {
                    info!(topic = %topic, "Broker client closed, consumer stopped");
                    return;
                }

                for e in &fetches.errors {
                    error!(topic = %topic, error = %e, "Broker poll error");
                }

                if fetches.records.is_empty() {
                    continue;
                }

                for record in fetches.records.iter().filter(|r| r.topic == topic) {
                    if let Err(e) = handler.handle(&record.payload, &record.topic).await {
                        error!(
                            topic = %record.topic,
                            offset = ?record.offset,
                            error = %e,
                            "Handler failed, record skipped"
                        );
                    }
                }

                match driver.commit_offsets().await {
                    Ok(()) => debug!(topic = %topic, records = fetches.records.len(), "Committed offsets"),
                    Err(e) => warn!(topic = %topic, error = %e, "Failed to commit offsets"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BrokerRecord, InMemoryDriver, Producer};
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(Vec<u8>, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl ConsumerHandler for Recorder {
        async fn handle(&self, payload: &[u8], topic: &str) -> anyhow::Result<()> {
            self.seen.lock().push((payload.to_vec(), topic.to_string()));
            if self.fail {
                anyhow::bail!("downstream rejected record");
            }
            Ok(())
        }
    }

    async fn wait_for(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    fn driver() -> Arc<InMemoryDriver> {
        Arc::new(InMemoryDriver::new().with_poll_timeout(Duration::from_millis(10)))
    }

    #[tokio::test]
    async fn test_records_handled_in_order_then_committed() {
        let driver = driver();
        let consumer = Consumer::new(Arc::clone(&driver) as Arc<dyn BrokerDriver>, "one-request").unwrap();
        let producer = Producer::new(Arc::clone(&driver) as Arc<dyn BrokerDriver>, "one-request");

        for i in 0..3 {
            producer.send_message(format!("m{i}").as_bytes()).await.unwrap();
        }

        let recorder = Arc::new(Recorder::default());
        let handle = consumer.start(Arc::clone(&recorder) as Arc<dyn ConsumerHandler>);

        wait_for(|| driver.committed_count() == 3).await;
        let seen: Vec<Vec<u8>> = recorder.seen.lock().iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(seen, vec![b"m0".to_vec(), b"m1".to_vec(), b"m2".to_vec()]);

        driver.close();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_handler_error_does_not_stop_loop() {
        let driver = driver();
        let consumer = Consumer::new(Arc::clone(&driver) as Arc<dyn BrokerDriver>, "t").unwrap();
        let producer = Producer::new(Arc::clone(&driver) as Arc<dyn BrokerDriver>, "t");

        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let handle = consumer.start(Arc::clone(&recorder) as Arc<dyn ConsumerHandler>);

        producer.send_message(b"first").await.unwrap();
        wait_for(|| recorder.seen.lock().len() == 1).await;
        producer.send_message(b"second").await.unwrap();
        wait_for(|| recorder.seen.lock().len() == 2).await;

        assert!(!handle.is_finished());
        driver.close();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_poll_and_commit_errors_are_tolerated() {
        let driver = driver();
        let consumer = Consumer::new(Arc::clone(&driver) as Arc<dyn BrokerDriver>, "t").unwrap();
        let producer = Producer::new(Arc::clone(&driver) as Arc<dyn BrokerDriver>, "t");

        driver.fail_next_poll("broker transport failure");
        driver.fail_next_commit("rebalance in progress");

        let recorder = Arc::new(Recorder::default());
        let handle = consumer.start(Arc::clone(&recorder) as Arc<dyn ConsumerHandler>);

        producer.send_message(b"a").await.unwrap();
        wait_for(|| recorder.seen.lock().len() == 1).await;
        producer.send_message(b"b").await.unwrap();
        wait_for(|| driver.committed_count() == 2).await;

        driver.close();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_other_topics_are_ignored() {
        let driver = driver();
        let consumer = Consumer::new(Arc::clone(&driver) as Arc<dyn BrokerDriver>, "mine").unwrap();
        // a second subscription on the same client
        driver.subscribe("theirs").unwrap();

        driver.produce(BrokerRecord::new("theirs", b"x".to_vec()), Box::new(|_| {}));
        driver.produce(BrokerRecord::new("mine", b"y".to_vec()), Box::new(|_| {}));

        let recorder = Arc::new(Recorder::default());
        let handle = consumer.start(Arc::clone(&recorder) as Arc<dyn ConsumerHandler>);
        wait_for(|| driver.delivered_count() == 2).await;
        wait_for(|| recorder.seen.lock().len() == 1).await;

        assert_eq!(recorder.seen.lock()[0], (b"y".to_vec(), "mine".to_string()));

        driver.close();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
