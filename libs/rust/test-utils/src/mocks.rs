//! Test doubles for the platform traits.
//!
//! Each double records what it saw so tests can assert on call counts and
//! arguments without a mocking framework.

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_access_token::{Token, TokenError, TokenFetcher};
use relay_broker::ConsumerHandler;
use relay_retry_job::{JobError, RetryAction, WorkItem, WorkSource};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Token fetcher that counts calls and can be slowed down or made to fail.
#[derive(Debug)]
pub struct CountingFetcher {
    calls: AtomicUsize,
    delay: Duration,
    lifetime: chrono::Duration,
    failures: Mutex<VecDeque<TokenError>>,
}

impl Default for CountingFetcher {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            lifetime: chrono::Duration::hours(1),
            failures: Mutex::new(VecDeque::new()),
        }
    }
}

impl CountingFetcher {
    /// Fetcher that succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every fetch.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Issue tokens that live for `lifetime`.
    #[must_use]
    pub const fn with_lifetime(mut self, lifetime: chrono::Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Fail the next fetch with `err`.
    pub fn fail_next(&self, err: TokenError) {
        self.failures.lock().push_back(err);
    }

    /// Completed and failed fetches so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenFetcher for CountingFetcher {
    async fn fetch(&self) -> Result<Token, TokenError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }
        Ok(crate::fixtures::bearer_token(
            &format!("token-{n}"),
            chrono::Utc::now(),
            self.lifetime,
        ))
    }
}

/// Work source backed by an in-memory status table.
#[derive(Debug, Default)]
pub struct InMemoryWorkSource {
    failed: Mutex<BTreeMap<String, bool>>,
    list_failures: Mutex<VecDeque<String>>,
}

impl InMemoryWorkSource {
    /// Source with the given ids marked failed.
    #[must_use]
    pub fn with_failed<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = Self::default();
        source
            .failed
            .lock()
            .extend(ids.into_iter().map(|id| (id.into(), true)));
        source
    }

    /// Mark `id` as no longer failed.
    pub fn complete(&self, id: &str) {
        self.failed.lock().insert(id.to_string(), false);
    }

    /// Mark `id` as failed.
    pub fn mark_failed(&self, id: &str) {
        self.failed.lock().insert(id.to_string(), true);
    }

    /// Ids still marked failed, in order.
    #[must_use]
    pub fn remaining(&self) -> Vec<String> {
        self.failed
            .lock()
            .iter()
            .filter(|(_, failed)| **failed)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Fail the next listing with `reason`.
    pub fn fail_next_list(&self, reason: impl Into<String>) {
        self.list_failures.lock().push_back(reason.into());
    }
}

#[async_trait]
impl WorkSource for InMemoryWorkSource {
    async fn list_failed(&self) -> Result<Vec<WorkItem>, JobError> {
        if let Some(reason) = self.list_failures.lock().pop_front() {
            return Err(JobError::source(reason));
        }
        Ok(self.remaining().into_iter().map(WorkItem::failed).collect())
    }

    async fn is_still_failed(&self, item: &WorkItem) -> Result<bool, JobError> {
        Ok(self.failed.lock().get(&item.id).copied().unwrap_or(false))
    }
}

/// Retry action that records the ids it was asked to retry.
#[derive(Debug, Default)]
pub struct RecordingRetryAction {
    retried: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    source: Option<Arc<InMemoryWorkSource>>,
}

impl RecordingRetryAction {
    /// Action that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Action that marks each successfully retried item completed in
    /// `source`. It yields once mid-retry so concurrent sweeps interleave.
    #[must_use]
    pub fn completing(source: Arc<InMemoryWorkSource>) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    /// Make retries of `id` fail.
    pub fn fail_for(&self, id: &str) {
        self.failing.lock().push(id.to_string());
    }

    /// Ids retried so far, in call order.
    #[must_use]
    pub fn retried(&self) -> Vec<String> {
        self.retried.lock().clone()
    }
}

#[async_trait]
impl RetryAction for RecordingRetryAction {
    async fn retry(&self, item: &WorkItem) -> anyhow::Result<()> {
        self.retried.lock().push(item.id.clone());
        if self.failing.lock().contains(&item.id) {
            anyhow::bail!("retry of {} rejected", item.id);
        }
        if let Some(source) = &self.source {
            tokio::task::yield_now().await;
            source.complete(&item.id);
        }
        Ok(())
    }
}

/// A record seen by a [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledRecord {
    /// Payload bytes as delivered
    pub payload: Vec<u8>,
    /// Topic the record was read from
    pub topic: String,
}

/// Consumer handler that records every call.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    records: Mutex<Vec<HandledRecord>>,
    fail_all: bool,
    notify: Notify,
}

impl RecordingHandler {
    /// Handler that accepts every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that records and then rejects every record.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Records handled so far.
    #[must_use]
    pub fn records(&self) -> Vec<HandledRecord> {
        self.records.lock().clone()
    }

    /// Wait until at least `n` records were handled, up to `timeout`.
    ///
    /// Returns whether the count was reached.
    pub async fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.records.lock().len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[async_trait]
impl ConsumerHandler for RecordingHandler {
    async fn handle(&self, payload: &[u8], topic: &str) -> anyhow::Result<()> {
        self.records.lock().push(HandledRecord {
            payload: payload.to_vec(),
            topic: topic.to_string(),
        });
        self.notify.notify_waiters();
        if self.fail_all {
            anyhow::bail!("handler rejected record");
        }
        Ok(())
    }
}
