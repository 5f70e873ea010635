//! Coalescing token cache.
//!
//! Readers load the current token without locking. A reader that finds the
//! slot empty or expired enters the refresh section, re-checks the slot
//! (another caller may have refreshed it meanwhile) and only then fetches.
//! At most one fetch is in flight per cache.

use crate::{Token, TokenCacheConfig, TokenError, TokenFetcher};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use relay_common::{Clock, RetryPolicy, SystemClock};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Anything that can hand out a valid access token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token that is not expired at the time of the call.
    async fn get_token(&self) -> Result<Arc<Token>, TokenError>;
}

/// Shared access token with coalesced refresh and bounded retry.
///
/// ```text
/// Empty -> Fresh -> Expired -> Fresh    (refresh succeeded)
///                           -> Expired  (refresh failed, error returned)
/// ```
pub struct TokenCache {
    slot: ArcSwapOption<Token>,
    refresh: Mutex<()>,
    fetcher: Arc<dyn TokenFetcher>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl TokenCache {
    /// Create an empty cache backed by `fetcher`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn TokenFetcher>, config: TokenCacheConfig) -> Self {
        Self {
            slot: ArcSwapOption::empty(),
            refresh: Mutex::new(()),
            fetcher,
            clock: Arc::new(SystemClock),
            retry: RetryPolicy::new(config.retry),
        }
    }

    /// Evaluate expiry against `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the cached token, refreshing it first if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns the last fetch error once every attempt failed. The cached
    /// token, if any, is left in place.
    pub async fn get_token(&self) -> Result<Arc<Token>, TokenError> {
        if let Some(token) = self.fresh() {
            return Ok(token);
        }
        self.refresh().await
    }

    /// The currently held token, expired or not.
    #[must_use]
    pub fn current(&self) -> Option<Arc<Token>> {
        self.slot.load_full()
    }

    fn fresh(&self) -> Option<Arc<Token>> {
        let now = self.clock.now();
        self.slot.load_full().filter(|token| !token.is_expired_at(now))
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<Arc<Token>, TokenError> {
        let _guard = self.refresh.lock().await;

        if let Some(token) = self.fresh() {
            debug!("Token refreshed by a concurrent caller");
            return Ok(token);
        }

        let token = self
            .retry
            .execute(|| self.fetcher.fetch())
            .await
            .inspect_err(|e| {
                warn!(
                    error = %e,
                    attempts = self.retry.max_attempts(),
                    "Failed to refresh access token"
                );
            })?;

        let token = Arc::new(token);
        self.slot.store(Some(Arc::clone(&token)));
        info!(expires_at = %token.expires_at, "Access token refreshed");

        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for TokenCache {
    async fn get_token(&self) -> Result<Arc<Token>, TokenError> {
        Self::get_token(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MockTokenFetcher;
    use chrono::{DateTime, Duration, Utc};
    use relay_common::{ManualClock, RetryConfig};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> TokenCacheConfig {
        TokenCacheConfig::default().with_retry(
            RetryConfig::default()
                .with_initial_delay(std::time::Duration::from_millis(1))
                .with_max_delay(std::time::Duration::from_millis(2))
                .without_jitter(),
        )
    }

    fn token(value: &str, expires_at: DateTime<Utc>) -> Token {
        Token::new(value, "bearer", "3600", expires_at)
    }

    struct SlowFetcher {
        calls: AtomicU32,
        expires_at: DateTime<Utc>,
    }

    #[async_trait]
    impl TokenFetcher for SlowFetcher {
        async fn fetch(&self) -> Result<Token, TokenError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(token(&format!("token-{n}"), self.expires_at))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_fetch() {
        let fetcher = Arc::new(SlowFetcher {
            calls: AtomicU32::new(0),
            expires_at: Utc::now() + Duration::hours(1),
        });
        let cache = Arc::new(TokenCache::new(
            Arc::clone(&fetcher) as Arc<dyn TokenFetcher>,
            fast_config(),
        ));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_token().await })
            })
            .collect();

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(tokens.iter().all(|t| Arc::ptr_eq(t, &tokens[0])));
        assert_eq!(tokens[0].access_token, "token-1");
    }

    #[tokio::test]
    async fn test_fresh_token_is_reused() {
        let expires_at = Utc::now() + Duration::minutes(5);
        let mut fetcher = MockTokenFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(move || Ok(token("abc", expires_at)));

        let cache = TokenCache::new(Arc::new(fetcher), fast_config());
        for _ in 0..3 {
            assert_eq!(cache.get_token().await.unwrap().access_token, "abc");
        }
    }

    #[tokio::test]
    async fn test_failing_fetch_uses_every_attempt() {
        let mut fetcher = MockTokenFetcher::new();
        fetcher
            .expect_fetch()
            .times(5)
            .returning(|| Err(TokenError::endpoint(503, "unavailable")));

        let cache = TokenCache::new(Arc::new(fetcher), fast_config());
        let err = cache.get_token().await.unwrap_err();

        assert!(matches!(err, TokenError::Endpoint { status: 503, .. }));
        assert!(cache.current().is_none());
    }

    #[tokio::test]
    async fn test_every_error_kind_uses_full_budget() {
        let mut fetcher = MockTokenFetcher::new();
        fetcher
            .expect_fetch()
            .times(5)
            .returning(|| Err(TokenError::Config("no endpoint".to_string())));

        let cache = TokenCache::new(Arc::new(fetcher), fast_config());
        let err = cache.get_token().await.unwrap_err();

        assert!(matches!(err, TokenError::Config(_)));
        assert!(cache.current().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let start = clock.now();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let mut fetcher = MockTokenFetcher::new();
        fetcher.expect_fetch().times(2).returning(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(token(&format!("token-{n}"), start + Duration::seconds(60 * i64::from(n))))
        });

        let cache = TokenCache::new(Arc::new(fetcher), fast_config())
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>);

        assert_eq!(cache.get_token().await.unwrap().access_token, "token-1");

        clock.advance(Duration::seconds(90));
        assert_eq!(cache.get_token().await.unwrap().access_token, "token-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_token() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let start = clock.now();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        // first fetch succeeds, the next five fail, then it recovers
        let mut fetcher = MockTokenFetcher::new();
        fetcher.expect_fetch().returning(move || {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(token("old", start + Duration::seconds(60))),
                1..=5 => Err(TokenError::fetch("auth endpoint down")),
                _ => Ok(token("new", start + Duration::hours(1))),
            }
        });

        let cache = TokenCache::new(Arc::new(fetcher), fast_config())
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>);

        cache.get_token().await.unwrap();
        clock.advance(Duration::minutes(2));

        assert!(cache.get_token().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(cache.current().unwrap().access_token, "old");

        assert_eq!(cache.get_token().await.unwrap().access_token, "new");
    }

    #[tokio::test]
    async fn test_provider_trait_delegates() {
        let expires_at = Utc::now() + Duration::minutes(5);
        let mut fetcher = MockTokenFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(move || Ok(token("via-trait", expires_at)));

        let provider: Arc<dyn TokenProvider> =
            Arc::new(TokenCache::new(Arc::new(fetcher), fast_config()));
        assert_eq!(provider.get_token().await.unwrap().access_token, "via-trait");
    }
}
