//! Token fetcher and cache configuration.

use relay_common::{HttpConfig, RetryConfig};
use secrecy::SecretString;

/// Default OAuth scope requested by the client-credentials grant.
pub const DEFAULT_SCOPE: &str = "general";

/// Path of the token endpoint below the auth base URL.
pub const TOKEN_PATH: &str = "/v2/oauth/token";

/// Credentials and endpoint for the client-credentials grant.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL of the auth service
    pub base_url: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
    /// Requested scope
    pub scope: String,
    /// Outbound HTTP settings
    pub http: HttpConfig,
}

impl AuthConfig {
    /// Create a configuration for `base_url` with the given credentials.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            scope: DEFAULT_SCOPE.to_string(),
            http: HttpConfig::default(),
        }
    }

    /// Set the requested scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Set the outbound HTTP settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Full URL of the token endpoint.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.base_url.trim_end_matches('/'))
    }
}

/// Token cache configuration.
#[derive(Debug, Clone, Default)]
pub struct TokenCacheConfig {
    /// Retry policy for the underlying fetch (default: 5 attempts)
    pub retry: RetryConfig,
}

impl TokenCacheConfig {
    /// Set the retry policy for the underlying fetch.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the number of fetch attempts per refresh.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry = self.retry.with_max_attempts(max_attempts);
        self
    }
}
