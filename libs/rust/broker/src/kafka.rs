//! Kafka driver built on `rdkafka`.

use crate::{AckCallback, BrokerConfig, BrokerDriver, BrokerError, BrokerRecord, Fetches, TopicConfig};
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer as _, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer as _};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Driver for an Apache Kafka (or API-compatible) cluster.
///
/// Holds one producer and one manual-commit consumer. Closing flips a flag
/// that makes every following poll report [`BrokerError::ClientClosed`].
pub struct KafkaDriver {
    producer: FutureProducer,
    consumer: StreamConsumer,
    admin_config: ClientConfig,
    topics: Mutex<Vec<String>>,
    closed: AtomicBool,
    close_signal: Notify,
    poll_timeout: Duration,
    produce_timeout: Duration,
    max_poll_records: usize,
}

impl KafkaDriver {
    /// Connect using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Config`] for invalid settings and
    /// [`BrokerError::Kafka`] if the client library refuses them.
    pub fn new(config: &BrokerConfig) -> Result<Self, BrokerError> {
        config.validate()?;
        if config.group_id.is_empty() {
            return Err(BrokerError::config("group id must not be empty"));
        }

        info!(
            bootstrap_servers = %config.bootstrap_servers.join(","),
            group_id = %config.group_id,
            "Initializing Kafka client"
        );

        let producer: FutureProducer = config.producer_config().create()?;
        let consumer: StreamConsumer = config.consumer_config().create()?;

        Ok(Self {
            producer,
            consumer,
            admin_config: config.client_config(),
            topics: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
            poll_timeout: config.poll_timeout,
            produce_timeout: config.produce_timeout,
            max_poll_records: config.max_poll_records,
        })
    }

    /// Create `topic` unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Topic`] if the broker refuses the topic.
    pub async fn ensure_topic(&self, topic: &TopicConfig) -> Result<(), BrokerError> {
        let admin: AdminClient<DefaultClientContext> = self.admin_config.create()?;
        let new_topic = NewTopic::new(
            &topic.name,
            topic.partition_count,
            TopicReplication::Fixed(topic.replica_count),
        );

        let results = admin.create_topics([&new_topic], &AdminOptions::new()).await?;
        for result in results {
            match result {
                Ok(name) => info!(topic = %name, partitions = topic.partition_count, "Created topic"),
                Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    debug!(topic = %name, "Topic already exists");
                }
                Err((name, code)) => {
                    return Err(BrokerError::Topic {
                        topic: name,
                        reason: code.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn to_record(message: &BorrowedMessage<'_>) -> BrokerRecord {
    BrokerRecord {
        topic: message.topic().to_string(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        partition: Some(message.partition()),
        offset: Some(message.offset()),
    }
}

#[async_trait]
impl BrokerDriver for KafkaDriver {
    fn produce(&self, record: BrokerRecord, on_ack: AckCallback) {
        if self.is_closed() {
            on_ack(Err(BrokerError::ClientClosed));
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            on_ack(Err(BrokerError::Produce("no async runtime to await delivery".to_string())));
            return;
        };

        let producer = self.producer.clone();
        let timeout = self.produce_timeout;

        runtime.spawn(async move {
            let mut future_record =
                FutureRecord::<[u8], [u8]>::to(&record.topic).payload(record.payload.as_slice());
            if let Some(key) = record.key.as_deref() {
                future_record = future_record.key(key);
            }

            let result = producer
                .send(future_record, Timeout::After(timeout))
                .await
                .map(|_| ())
                .map_err(|(e, _)| BrokerError::Kafka(e));
            on_ack(result);
        });
    }

    async fn poll_fetches(&self) -> Fetches {
        if self.is_closed() {
            return Fetches::closed();
        }

        let first = tokio::select! {
            () = self.close_signal.notified() => return Fetches::closed(),
            received = tokio::time::timeout(self.poll_timeout, self.consumer.recv()) => received,
        };

        let mut fetches = Fetches::default();
        match first {
            Err(_elapsed) => return fetches,
            Ok(Err(e)) => {
                fetches.errors.push(BrokerError::Kafka(e));
                return fetches;
            }
            Ok(Ok(message)) => fetches.records.push(to_record(&message)),
        }

        // drain whatever is already buffered
        while fetches.records.len() < self.max_poll_records {
            match self.consumer.recv().now_or_never() {
                Some(Ok(message)) => fetches.records.push(to_record(&message)),
                Some(Err(e)) => {
                    fetches.errors.push(BrokerError::Kafka(e));
                    break;
                }
                None => break,
            }
        }

        fetches
    }

    async fn commit_offsets(&self) -> Result<(), BrokerError> {
        self.consumer
            .commit_consumer_state(CommitMode::Sync)
            .map_err(|e| BrokerError::Commit(e.to_string()))
    }

    fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
        let mut topics = self.topics.lock();
        if !topics.iter().any(|t| t == topic) {
            topics.push(topic.to_string());
        }

        let names: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.consumer.subscribe(&names)?;
        info!(topics = ?names, "Subscribed to topics");
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.close_signal.notify_waiters();
        self.consumer.unsubscribe();

        if let Err(e) = self.producer.flush(Timeout::After(self.produce_timeout)) {
            warn!(error = %e, "Failed to flush producer on close");
        }
        info!("Kafka client closed");
    }
}
