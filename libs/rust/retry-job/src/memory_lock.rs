//! In-process distributed lock.

use crate::{DistributedLease, DistributedLock, LockError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Default)]
struct Faults {
    acquire: VecDeque<String>,
    release: VecDeque<String>,
}

/// [`DistributedLock`] shared by everything in one process.
///
/// Honors lease TTLs and owner tokens like the Redis lock does. Failures
/// can be queued for the next acquire or release.
#[derive(Default)]
pub struct InMemoryLock {
    held: Mutex<HashMap<String, (String, Instant)>>,
    faults: Mutex<Faults>,
    releases: AtomicUsize,
}

impl InMemoryLock {
    /// An empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `key` for `ttl` on behalf of some other owner.
    pub fn hold_elsewhere(&self, key: &str, ttl: Duration) {
        self.held.lock().insert(
            key.to_string(),
            ("elsewhere".to_string(), Instant::now() + ttl),
        );
    }

    /// Whether `key` is currently held.
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        self.held
            .lock()
            .get(key)
            .is_some_and(|(_, expires_at)| Instant::now() < *expires_at)
    }

    /// Successful releases so far.
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Fail the next acquire with `reason`.
    pub fn fail_next_acquire(&self, reason: impl Into<String>) {
        self.faults.lock().acquire.push_back(reason.into());
    }

    /// Fail the next release with `reason`.
    pub fn fail_next_release(&self, reason: impl Into<String>) {
        self.faults.lock().release.push_back(reason.into());
    }
}

#[async_trait]
impl DistributedLock for InMemoryLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<DistributedLease, LockError> {
        if let Some(reason) = self.faults.lock().acquire.pop_front() {
            return Err(LockError::backend(reason));
        }

        let mut held = self.held.lock();
        if let Some((_, expires_at)) = held.get(key) {
            if Instant::now() < *expires_at {
                return Err(LockError::Held {
                    key: key.to_string(),
                });
            }
        }

        let lease = DistributedLease::new(key, uuid::Uuid::new_v4().to_string(), ttl);
        held.insert(key.to_string(), (lease.token.clone(), lease.expires_at));
        Ok(lease)
    }

    async fn release(&self, lease: &DistributedLease) -> Result<(), LockError> {
        if let Some(reason) = self.faults.lock().release.pop_front() {
            return Err(LockError::backend(reason));
        }

        let mut held = self.held.lock();
        match held.get(&lease.resource_id) {
            Some((token, _)) if *token == lease.token => {
                held.remove(&lease.resource_id);
                self.releases.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            _ => Err(LockError::NotHeld {
                key: lease.resource_id.clone(),
            }),
        }
    }
}
