//! Forwarder errors.

use relay_access_token::TokenError;
use relay_broker::BrokerError;
use relay_common::PlatformError;
use relay_id::IdError;
use thiserror::Error;

/// Errors raised while configuring the service or forwarding a request.
#[derive(Error, Debug)]
pub enum ForwarderError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Consumed payload is not a valid one-request
    #[error("failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),

    /// No bearer token could be obtained
    #[error("failed to get access token: {0}")]
    Token(#[from] TokenError),

    /// Transport failure talking to the downstream API
    #[error("failed to send request: {0}")]
    Http(#[from] reqwest::Error),

    /// Downstream API answered with a non-success status
    #[error("downstream returned {status}: {body}")]
    Downstream {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Broker setup failed
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Node identity could not be derived
    #[error(transparent)]
    Identity(#[from] IdError),
}

impl ForwarderError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<PlatformError> for ForwarderError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Config(msg) => Self::Config(msg),
            other => Self::Config(other.to_string()),
        }
    }
}
