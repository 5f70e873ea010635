//! Redis-backed distributed lock.
//!
//! Acquire is `SET key token NX PX ttl`; release deletes the key only if it
//! still holds this lease's token, so a lease that expired and was taken
//! over by another node is never released from under it.

use crate::{DistributedLease, DistributedLock, LockError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, instrument};

static RELEASE_SCRIPT: Lazy<redis::Script> = Lazy::new(|| {
    redis::Script::new(
        r"
        if redis.call('GET', KEYS[1]) == ARGV[1] then
            return redis.call('DEL', KEYS[1])
        end
        return 0
        ",
    )
});

/// Redis lock configuration.
#[derive(Debug, Clone)]
pub struct RedisLockConfig {
    /// Prefix prepended to every lock key
    pub key_prefix: String,
    /// Acquisition attempts before giving up (default: 32)
    pub tries: u32,
    /// Lower bound of the delay between attempts (default: 50ms)
    pub min_retry_delay: Duration,
    /// Upper bound of the delay between attempts (default: 250ms)
    pub max_retry_delay: Duration,
}

impl Default for RedisLockConfig {
    fn default() -> Self {
        Self {
            key_prefix: "relay:lock:".to_string(),
            tries: 32,
            min_retry_delay: Duration::from_millis(50),
            max_retry_delay: Duration::from_millis(250),
        }
    }
}

impl RedisLockConfig {
    /// Set the key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the number of acquisition attempts (clamped to at least one).
    #[must_use]
    pub fn with_tries(mut self, tries: u32) -> Self {
        self.tries = tries.max(1);
        self
    }

    /// Set the bounds of the delay between attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, min: Duration, max: Duration) -> Self {
        self.min_retry_delay = min.min(max);
        self.max_retry_delay = max.max(min);
        self
    }

    fn retry_delay(&self) -> Duration {
        let min = u64::try_from(self.min_retry_delay.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_retry_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Distributed lock on a single Redis instance.
#[derive(Clone)]
pub struct RedisLock {
    conn: ConnectionManager,
    config: RedisLockConfig,
}

impl RedisLock {
    /// Connect to the Redis at `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Redis`] if the URL is invalid or the server is
    /// unreachable.
    pub async fn connect(redis_url: &str, config: RedisLockConfig) -> Result<Self, LockError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, config))
    }

    /// Use an existing connection.
    #[must_use]
    pub const fn new(conn: ConnectionManager, config: RedisLockConfig) -> Self {
        Self { conn, config }
    }

    fn key(&self, resource_id: &str) -> String {
        format!("{}{resource_id}", self.config.key_prefix)
    }
}

#[async_trait]
impl DistributedLock for RedisLock {
    #[instrument(skip(self))]
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<DistributedLease, LockError> {
        let redis_key = self.key(key);
        let token = uuid::Uuid::new_v4().to_string();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn.clone();

        for attempt in 1..=self.config.tries {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(&redis_key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(ttl_ms)
                .query_async(&mut conn)
                .await?;

            if acquired.is_some() {
                debug!(attempt, "Lease acquired");
                return Ok(DistributedLease::new(key, token, ttl));
            }

            if attempt < self.config.tries {
                tokio::time::sleep(self.config.retry_delay()).await;
            }
        }

        Err(LockError::Held {
            key: key.to_string(),
        })
    }

    #[instrument(skip(self, lease), fields(key = %lease.resource_id))]
    async fn release(&self, lease: &DistributedLease) -> Result<(), LockError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = RELEASE_SCRIPT
            .key(self.key(&lease.resource_id))
            .arg(&lease.token)
            .invoke_async(&mut conn)
            .await?;

        if deleted == 0 {
            return Err(LockError::NotHeld {
                key: lease.resource_id.clone(),
            });
        }
        Ok(())
    }
}
