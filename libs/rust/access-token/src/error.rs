//! Token acquisition errors.

use relay_common::Retryable;
use thiserror::Error;

/// Errors raised while obtaining an access token.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Transport failure talking to the auth endpoint
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth endpoint answered with a non-success status
    #[error("token endpoint returned {status}: {body}")]
    Endpoint {
        /// HTTP status code
        status: u16,
        /// Response body, as returned
        body: String,
    },

    /// The auth endpoint answered with an unusable body
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// The fetcher was built with unusable settings
    #[error("token configuration error: {0}")]
    Config(String),

    /// Fetch failed for a reason specific to a custom fetcher
    #[error("token fetch failed: {0}")]
    Fetch(String),
}

impl TokenError {
    /// Create an endpoint error from a status code and body.
    #[must_use]
    pub fn endpoint(status: u16, body: impl Into<String>) -> Self {
        Self::Endpoint {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid-response error.
    #[must_use]
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create a generic fetch error.
    #[must_use]
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }
}

impl Retryable for TokenError {
    /// The cache retries every fetch failure up to its attempt budget. A
    /// bad endpoint is already rejected when the fetcher is built.
    fn is_retryable(&self) -> bool {
        true
    }
}
