//! Broker handler for one-requests.

use crate::downstream::ThreeClient;
use crate::error::ForwarderError;
use crate::model::{OneRequest, ThreeRequest};
use anyhow::Context;
use async_trait::async_trait;
use relay_broker::ConsumerHandler;
use relay_id::IdSource;
use std::sync::Arc;
use tracing::info;

/// Decodes one-requests and forwards them downstream.
pub struct OneRequestHandler {
    ids: Arc<dyn IdSource>,
    client: ThreeClient,
}

impl OneRequestHandler {
    /// Create a handler stamping ids from `ids`.
    #[must_use]
    pub fn new(ids: Arc<dyn IdSource>, client: ThreeClient) -> Self {
        Self { ids, client }
    }

    /// Decode `payload` and forward it, returning the downstream id used.
    ///
    /// # Errors
    ///
    /// Fails on a malformed payload or any downstream error.
    pub async fn forward(&self, payload: &[u8]) -> Result<String, ForwarderError> {
        let one_request: OneRequest = serde_json::from_slice(payload)?;
        let request = ThreeRequest::new(self.ids.generate_id(), one_request);

        let body = self.client.post_three_request(&request).await?;
        info!(id = %request.id, user_id = %request.one_request.user_id, response = %body, "Forwarded three request");
        Ok(request.id)
    }
}

#[async_trait]
impl ConsumerHandler for OneRequestHandler {
    async fn handle(&self, payload: &[u8], topic: &str) -> anyhow::Result<()> {
        self.forward(payload)
            .await
            .with_context(|| format!("failed to forward message from {topic}"))?;
        Ok(())
    }
}
