//! Test fixtures with sample data.

use chrono::{DateTime, Duration, TimeZone, Utc};
use relay_access_token::Token;
use relay_retry_job::WorkItem;
use serde::{Deserialize, Serialize};

/// Upstream message consumed from the inbound topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleMessage {
    /// Upstream user id
    pub user_id: String,
}

impl SampleMessage {
    /// Message for `user_id`.
    #[must_use]
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
        }
    }

    /// JSON wire form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Fixed instant used by clock-driven tests: 2024-01-01T00:00:00Z.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Bearer token valid for `lifetime` past `issued_at`.
#[must_use]
pub fn bearer_token(value: &str, issued_at: DateTime<Utc>, lifetime: Duration) -> Token {
    Token::new(
        value,
        "Bearer",
        lifetime.num_seconds().to_string(),
        issued_at + lifetime,
    )
}

/// Bearer token valid for an hour from now.
#[must_use]
pub fn fresh_token(value: &str) -> Token {
    bearer_token(value, Utc::now(), Duration::hours(1))
}

/// Token endpoint response body.
#[must_use]
pub fn token_response_json(access_token: &str, expires_in: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in,
    })
}

/// Failed work items `tx-1 ..= tx-n`.
#[must_use]
pub fn failed_items(n: usize) -> Vec<WorkItem> {
    (1..=n).map(|i| WorkItem::failed(format!("tx-{i}"))).collect()
}
