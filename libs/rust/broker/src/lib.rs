//! Message broker client.
//!
//! [`Producer::send_message`] blocks until the broker acknowledges the
//! record. [`Consumer::start`] runs an at-least-once poll loop on its own
//! task, committing offsets after each batch, until the [`BrokerClient`]
//! is closed.
//!
//! ```no_run
//! use relay_broker::{BrokerClient, BrokerConfig};
//!
//! # async fn example() -> Result<(), relay_broker::BrokerError> {
//! let client = BrokerClient::connect(&BrokerConfig::new("kafka:9092").with_group_id("two"))?;
//! client.producer("one-request").send_message(br#"{"user_id":"u1"}"#).await?;
//! client.close();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod consumer;
pub mod driver;
pub mod error;
pub mod kafka;
pub mod memory;
pub mod producer;

pub use client::BrokerClient;
pub use config::{BrokerConfig, TopicConfig};
pub use consumer::{Consumer, ConsumerHandler};
pub use driver::{AckCallback, BrokerDriver, BrokerRecord, Fetches};
pub use error::BrokerError;
pub use kafka::KafkaDriver;
pub use memory::InMemoryDriver;
pub use producer::Producer;
