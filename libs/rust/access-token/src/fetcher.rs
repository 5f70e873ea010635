//! Token fetchers.
//!
//! [`TokenFetcher`] is one round trip to an auth endpoint.
//! [`ClientCredentialsFetcher`] implements it for the OAuth
//! client-credentials grant.

use crate::{AuthConfig, Token, TokenError};
use async_trait::async_trait;
use chrono::TimeDelta;
use relay_common::{Clock, SystemClock, build_http_client};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Fetches a new access token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    /// Perform one fetch. No retries.
    async fn fetch(&self) -> Result<Token, TokenError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
    Seconds(i64),
    Text(String),
}

impl ExpiresIn {
    fn raw(&self) -> String {
        match self {
            Self::Seconds(s) => s.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    fn seconds(&self) -> Result<i64, TokenError> {
        let seconds = match self {
            Self::Seconds(s) => *s,
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| TokenError::invalid_response(format!("expires_in {s:?}: {e}")))?,
        };

        if seconds < 0 {
            return Err(TokenError::invalid_response(format!(
                "expires_in must not be negative, got {seconds}"
            )));
        }
        Ok(seconds)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    expires_in: ExpiresIn,
}

/// OAuth client-credentials fetcher.
///
/// Posts `grant_type=client_credentials` with HTTP basic auth and stamps
/// the absolute expiry with the injected clock.
pub struct ClientCredentialsFetcher {
    http: reqwest::Client,
    endpoint: Url,
    client_id: String,
    client_secret: SecretString,
    scope: String,
    clock: Arc<dyn Clock>,
}

impl ClientCredentialsFetcher {
    /// Build a fetcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] if the endpoint URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self, TokenError> {
        let token_url = config.token_url();
        let endpoint = Url::parse(&token_url)
            .map_err(|e| TokenError::Config(format!("token url {token_url}: {e}")))?;
        let http = build_http_client(&config.http)
            .map_err(|e| TokenError::Config(format!("http client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Use `clock` to compute absolute expiries.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The token endpoint this fetcher posts to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TokenFetcher for ClientCredentialsFetcher {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch(&self) -> Result<Token, TokenError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::endpoint(status.as_u16(), body));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::invalid_response(e.to_string()))?;

        if body.access_token.is_empty() {
            return Err(TokenError::invalid_response("empty access_token"));
        }

        let seconds = body.expires_in.seconds()?;
        let expires_at = TimeDelta::try_seconds(seconds)
            .and_then(|lifetime| self.clock.now().checked_add_signed(lifetime))
            .ok_or_else(|| TokenError::invalid_response(format!("expires_in out of range: {seconds}")))?;

        debug!(expires_in = seconds, "Fetched access token");

        Ok(Token::new(
            body.access_token,
            body.token_type,
            body.expires_in.raw(),
            expires_at,
        ))
    }
}
