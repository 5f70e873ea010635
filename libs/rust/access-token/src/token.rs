//! Access token value.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// A bearer token issued by the auth endpoint.
///
/// Immutable once built; a refresh replaces the token rather than
/// mutating it.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// The bearer credential
    pub access_token: String,
    /// Token type as reported by the provider (usually `bearer`)
    pub token_type: String,
    /// Lifetime in seconds, as reported by the provider
    pub expires_in: String,
    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Build a token.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in: expires_in.into(),
            expires_at,
        }
    }

    /// Whether the token has expired at `now`.
    ///
    /// The expiry is normalized to whole seconds through its RFC 3339 form
    /// before comparing, so a token expiring within the current second is
    /// already stale. An expiry that does not survive the round trip counts
    /// as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let rendered = self.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        DateTime::parse_from_rfc3339(&rendered)
            .map_or(true, |expires_at| expires_at < now)
    }

    /// `Authorization` header value for this token.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn token_expiring_at(expires_at: DateTime<Utc>) -> Token {
        Token::new("secret-value", "bearer", "3600", expires_at)
    }

    #[test]
    fn test_fresh_token_not_expired() {
        let now = Utc::now();
        let token = token_expiring_at(now + Duration::minutes(5));
        assert!(!token.is_expired_at(now));
    }

    #[test]
    fn test_old_token_expired() {
        let now = Utc::now();
        let token = token_expiring_at(now - Duration::hours(1));
        assert!(token.is_expired_at(now));
    }

    #[test]
    fn test_subsecond_remainder_is_ignored() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::milliseconds(300);
        let token = token_expiring_at(now + Duration::milliseconds(500));
        // expiry truncates to 12:00:00, which is before 12:00:00.300
        assert!(token.is_expired_at(now));
    }

    #[test]
    fn test_expiry_on_exact_second() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let token = token_expiring_at(now);
        assert!(!token.is_expired_at(now));
        assert!(token.is_expired_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = token_expiring_at(Utc::now());
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_authorization_header() {
        let token = Token::new("abc", "BEARER", "60", Utc::now());
        assert_eq!(token.authorization_header(), "Bearer abc");
    }
}
