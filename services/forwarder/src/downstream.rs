//! Client for the downstream `/three` endpoint.

use crate::error::ForwarderError;
use crate::model::ThreeRequest;
use relay_access_token::TokenProvider;
use relay_common::{HttpConfig, build_http_client};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Path of the three-request endpoint below the downstream base URL.
pub const THREE_REQUEST_PATH: &str = "/three";

const MAX_ERROR_BODY: usize = 1024;

/// Posts three-requests with a bearer token from a [`TokenProvider`].
#[derive(Clone)]
pub struct ThreeClient {
    http: Client,
    endpoint: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl ThreeClient {
    /// Create a client for the API at `base_url`. Every request carries
    /// `language: en`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL cannot be extended or the
    /// HTTP client cannot be built.
    pub fn new(
        base_url: &Url,
        http: &HttpConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ForwarderError> {
        let endpoint = Url::parse(&format!(
            "{}{THREE_REQUEST_PATH}",
            base_url.as_str().trim_end_matches('/')
        ))
        .map_err(|e| ForwarderError::config(format!("Invalid THREE_URL: {e}")))?;

        let http = build_http_client(&http.clone().with_default_header("language", "en"))?;

        Ok(Self {
            http,
            endpoint,
            tokens,
        })
    }

    /// Full URL requests are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Post `request`, returning the response body.
    ///
    /// # Errors
    ///
    /// Fails if no token is available, the request cannot be sent or the
    /// API answers with a non-success status.
    #[instrument(skip_all, fields(id = %request.id))]
    pub async fn post_three_request(&self, request: &ThreeRequest) -> Result<String, ForwarderError> {
        let token = self.tokens.get_token().await?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, token.authorization_header())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ForwarderError::Downstream {
                status: status.as_u16(),
                body: truncate(body, MAX_ERROR_BODY),
            });
        }

        debug!(status = status.as_u16(), "Three request accepted");
        Ok(body)
    }
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut end = max;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short".to_string(), 10), "short");
        assert_eq!(truncate("abcdef".to_string(), 3), "abc");
        // 'é' is two bytes
        assert_eq!(truncate("aé".to_string(), 2), "a");
    }
}
