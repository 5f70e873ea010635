//! Distributed lease capability.

use crate::LockError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// A time-bounded exclusive grant on one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributedLease {
    /// Resource the lease covers
    pub resource_id: String,
    /// Owner token; only its holder may release the lease
    pub token: String,
    /// When the lock service lets the lease lapse on its own
    pub expires_at: Instant,
}

impl DistributedLease {
    /// A lease on `resource_id` held by `token` for `ttl` from now.
    #[must_use]
    pub fn new(resource_id: impl Into<String>, token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            resource_id: resource_id.into(),
            token: token.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    /// Whether the lease has lapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cross-process mutual exclusion.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Acquire the lease on `key` for `ttl`.
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<DistributedLease, LockError>;

    /// Release `lease`, if this holder still owns it.
    async fn release(&self, lease: &DistributedLease) -> Result<(), LockError>;
}
