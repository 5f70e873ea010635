//! Application wiring.

use crate::config::Config;
use crate::downstream::ThreeClient;
use crate::error::ForwarderError;
use crate::handler::OneRequestHandler;
use relay_access_token::{ClientCredentialsFetcher, TokenCache};
use relay_broker::{BrokerClient, Consumer, ConsumerHandler, KafkaDriver};
use relay_common::{PlatformError, ShutdownCoordinator};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// The running pieces of the forwarder.
pub struct Application {
    broker: BrokerClient,
    consumer: Consumer,
    handler: Arc<OneRequestHandler>,
}

impl Application {
    /// Build the production application from `config`.
    ///
    /// Installs the process ID generator, connects to Kafka and makes sure
    /// the inbound topic exists.
    ///
    /// # Errors
    ///
    /// Returns any configuration or broker setup error.
    pub async fn new(config: &Config) -> Result<Self, ForwarderError> {
        let ids = relay_id::process::install(config.node)?;

        let fetcher = ClientCredentialsFetcher::new(&config.auth)?;
        let tokens = Arc::new(TokenCache::new(Arc::new(fetcher), config.token_cache.clone()));
        let client = ThreeClient::new(&config.three_url, &config.auth.http, tokens)?;

        let driver = Arc::new(KafkaDriver::new(&config.broker)?);
        driver.ensure_topic(&config.broker.topic).await?;
        let broker = BrokerClient::with_driver(driver);

        let handler = Arc::new(OneRequestHandler::new(Arc::new(ids), client));
        Self::with_parts(broker, config.topic(), handler)
    }

    /// Assemble an application from already-built parts.
    ///
    /// # Errors
    ///
    /// Returns the broker's subscription error.
    pub fn with_parts(
        broker: BrokerClient,
        topic: &str,
        handler: Arc<OneRequestHandler>,
    ) -> Result<Self, ForwarderError> {
        let consumer = broker.consumer(topic)?;
        Ok(Self {
            broker,
            consumer,
            handler,
        })
    }

    /// Start consuming. Returns the poll loop's handle.
    pub fn run(&self) -> JoinHandle<()> {
        info!(topic = %self.consumer.topic(), "Starting one-request consumer");
        self.consumer
            .start(Arc::clone(&self.handler) as Arc<dyn ConsumerHandler>)
    }

    /// Terminators to run on shutdown: close the broker, which ends the
    /// poll loop behind `consumer_task`.
    #[must_use]
    pub fn terminators(&self, consumer_task: JoinHandle<()>) -> ShutdownCoordinator {
        let mut shutdown = ShutdownCoordinator::new();
        let broker = self.broker.clone();
        shutdown.register("broker", async move {
            broker.close();
            consumer_task
                .await
                .map_err(|e| PlatformError::Internal(format!("consumer task failed: {e}")))
        });
        shutdown
    }
}
