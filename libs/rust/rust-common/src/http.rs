//! Outbound HTTP clients.
//!
//! Every outbound caller in the platform (token endpoint, downstream APIs)
//! builds its `reqwest` client here so timeouts, pooling and fixed headers
//! are set in one place.

use crate::PlatformError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Outbound HTTP settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout (default: 10s)
    pub timeout: Duration,
    /// TCP/TLS connect timeout (default: 5s)
    pub connect_timeout: Duration,
    /// How long idle pooled connections are kept (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Idle connections kept per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// `User-Agent` sent with every request
    pub user_agent: String,
    /// Headers sent with every request, in insertion order
    pub default_headers: Vec<(String, String)>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: concat!("relay-platform/", env!("CARGO_PKG_VERSION")).to_string(),
            default_headers: Vec::new(),
        }
    }
}

impl HttpConfig {
    /// Set the whole-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a header sent with every request. A later value for the same
    /// name replaces an earlier one.
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.default_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.default_headers.push((name, value.into()));
        self
    }

    fn header_map(&self) -> Result<HeaderMap, PlatformError> {
        let mut headers = HeaderMap::with_capacity(self.default_headers.len());
        for (name, value) in &self.default_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| PlatformError::config(format!("invalid header name {name:?}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| PlatformError::config(format!("invalid value for header {name}: {e}")))?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

/// Build a client from `config` (rustls, pooled).
///
/// # Errors
///
/// Returns [`PlatformError::Config`] for an invalid default header or if the
/// TLS backend cannot be initialized.
///
/// # Examples
///
/// ```
/// use relay_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default()
///     .with_timeout(Duration::from_secs(3))
///     .with_default_header("language", "en");
/// assert!(build_http_client(&config).is_ok());
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, PlatformError> {
    ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .default_headers(config.header_map()?)
        .use_rustls_tls()
        .build()
        .map_err(|e| PlatformError::config(format!("failed to build http client: {e}")))
}
