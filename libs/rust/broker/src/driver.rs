//! The broker driver seam.
//!
//! Producers and consumers talk to the broker only through
//! [`BrokerDriver`], so the poll loop and ack handling are the same for
//! Kafka and for the in-memory driver used in tests.

use crate::BrokerError;
use async_trait::async_trait;

/// One record on its way to or from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRecord {
    /// Topic the record belongs to
    pub topic: String,
    /// Partitioning key, if any
    pub key: Option<Vec<u8>>,
    /// Payload bytes, untouched
    pub payload: Vec<u8>,
    /// Partition, once assigned by the broker
    pub partition: Option<i32>,
    /// Offset, once assigned by the broker
    pub offset: Option<i64>,
}

impl BrokerRecord {
    /// A keyless record for `topic`.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            payload: payload.into(),
            partition: None,
            offset: None,
        }
    }

    /// Set the partitioning key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Called exactly once with the broker's verdict on a produced record.
pub type AckCallback = Box<dyn FnOnce(Result<(), BrokerError>) + Send + 'static>;

/// Outcome of one poll: zero or more records and zero or more errors.
#[derive(Debug, Default)]
pub struct Fetches {
    /// Records in broker order
    pub records: Vec<BrokerRecord>,
    /// Poll-level errors
    pub errors: Vec<BrokerError>,
}

impl Fetches {
    /// A poll result signalling that the client was closed.
    #[must_use]
    pub fn closed() -> Self {
        Self {
            records: Vec::new(),
            errors: vec![BrokerError::ClientClosed],
        }
    }

    /// A poll result carrying a single error.
    #[must_use]
    pub fn error(error: BrokerError) -> Self {
        Self {
            records: Vec::new(),
            errors: vec![error],
        }
    }

    /// Whether any error says the client was closed.
    #[must_use]
    pub fn is_client_closed(&self) -> bool {
        self.errors.iter().any(BrokerError::is_client_closed)
    }

    /// Whether the poll returned neither records nor errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.errors.is_empty()
    }
}

/// Connection to a message broker.
#[async_trait]
pub trait BrokerDriver: Send + Sync {
    /// Enqueue `record` and report its delivery through `on_ack`.
    ///
    /// Returns immediately; `on_ack` runs once the broker accepted or
    /// rejected the record.
    fn produce(&self, record: BrokerRecord, on_ack: AckCallback);

    /// Wait for the next batch of records on subscribed topics.
    ///
    /// After [`close`](Self::close), returns a batch whose errors include
    /// [`BrokerError::ClientClosed`].
    async fn poll_fetches(&self) -> Fetches;

    /// Commit the offsets of every record returned so far.
    async fn commit_offsets(&self) -> Result<(), BrokerError>;

    /// Add `topic` to the subscriptions.
    fn subscribe(&self, topic: &str) -> Result<(), BrokerError>;

    /// Close the connection. Idempotent.
    fn close(&self);
}
