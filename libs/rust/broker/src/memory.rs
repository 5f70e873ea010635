//! In-process broker driver.
//!
//! Records are kept in a single log per process. Polls hand out records
//! for subscribed topics in production order. Faults can be queued to make
//! the next produce, poll or commit fail.

use crate::{AckCallback, BrokerDriver, BrokerError, BrokerRecord, Fetches};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct State {
    log: Vec<BrokerRecord>,
    pending: VecDeque<BrokerRecord>,
    subscriptions: HashSet<String>,
    delivered: usize,
    committed: usize,
}

#[derive(Default)]
struct Faults {
    produce: VecDeque<String>,
    poll: VecDeque<String>,
    commit: VecDeque<String>,
}

/// Broker driver that never leaves the process.
pub struct InMemoryDriver {
    state: Mutex<State>,
    faults: Mutex<Faults>,
    arrivals: Notify,
    closed: AtomicBool,
    poll_timeout: Duration,
    max_poll_records: usize,
}

impl Default for InMemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDriver {
    /// An empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            faults: Mutex::new(Faults::default()),
            arrivals: Notify::new(),
            closed: AtomicBool::new(false),
            poll_timeout: Duration::from_millis(100),
            max_poll_records: 500,
        }
    }

    /// Set how long an idle poll waits before returning an empty batch.
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the maximum records returned per poll.
    #[must_use]
    pub fn with_max_poll_records(mut self, max: usize) -> Self {
        self.max_poll_records = max.max(1);
        self
    }

    /// Fail the next produce with `reason`.
    pub fn fail_next_produce(&self, reason: impl Into<String>) {
        self.faults.lock().produce.push_back(reason.into());
    }

    /// Make the next poll return an error with `reason` and no records.
    pub fn fail_next_poll(&self, reason: impl Into<String>) {
        self.faults.lock().poll.push_back(reason.into());
    }

    /// Fail the next offset commit with `reason`.
    pub fn fail_next_commit(&self, reason: impl Into<String>) {
        self.faults.lock().commit.push_back(reason.into());
    }

    /// Every record accepted so far, in order.
    #[must_use]
    pub fn produced(&self) -> Vec<BrokerRecord> {
        self.state.lock().log.clone()
    }

    /// Records handed out by polls so far.
    #[must_use]
    pub fn delivered_count(&self) -> usize {
        self.state.lock().delivered
    }

    /// Records whose offsets have been committed.
    #[must_use]
    pub fn committed_count(&self) -> usize {
        self.state.lock().committed
    }

    /// Whether [`close`](BrokerDriver::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn take_subscribed(&self) -> Vec<BrokerRecord> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let mut batch = Vec::new();
        let mut kept = VecDeque::with_capacity(state.pending.len());
        while let Some(record) = state.pending.pop_front() {
            if batch.len() < self.max_poll_records && state.subscriptions.contains(&record.topic) {
                batch.push(record);
            } else {
                kept.push_back(record);
            }
        }
        state.pending = kept;
        state.delivered += batch.len();
        batch
    }
}

#[async_trait]
impl BrokerDriver for InMemoryDriver {
    fn produce(&self, record: BrokerRecord, on_ack: AckCallback) {
        if self.is_closed() {
            on_ack(Err(BrokerError::ClientClosed));
            return;
        }
        if let Some(reason) = self.faults.lock().produce.pop_front() {
            on_ack(Err(BrokerError::Produce(reason)));
            return;
        }

        {
            let mut state = self.state.lock();
            let offset = i64::try_from(state.log.len()).unwrap_or(i64::MAX);
            let record = BrokerRecord {
                partition: Some(0),
                offset: Some(offset),
                ..record
            };
            state.log.push(record.clone());
            state.pending.push_back(record);
        }
        self.arrivals.notify_waiters();
        on_ack(Ok(()));
    }

    async fn poll_fetches(&self) -> Fetches {
        let arrival = self.arrivals.notified();
        tokio::pin!(arrival);

        for _ in 0..2 {
            // register interest before looking, so a produce in between is not missed
            arrival.as_mut().enable();

            if self.is_closed() {
                return Fetches::closed();
            }
            if let Some(reason) = self.faults.lock().poll.pop_front() {
                return Fetches::error(BrokerError::Poll(reason));
            }

            let records = self.take_subscribed();
            if !records.is_empty() {
                return Fetches {
                    records,
                    errors: Vec::new(),
                };
            }

            if tokio::time::timeout(self.poll_timeout, arrival.as_mut()).await.is_err() {
                return Fetches::default();
            }
            arrival.set(self.arrivals.notified());
        }

        Fetches::default()
    }

    async fn commit_offsets(&self) -> Result<(), BrokerError> {
        if let Some(reason) = self.faults.lock().commit.pop_front() {
            return Err(BrokerError::Commit(reason));
        }
        let mut state = self.state.lock();
        state.committed = state.delivered;
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::ClientClosed);
        }
        self.state.lock().subscriptions.insert(topic.to_string());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.arrivals.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ack_into(slot: &Arc<Mutex<Option<Result<(), BrokerError>>>>) -> AckCallback {
        let slot = Arc::clone(slot);
        Box::new(move |result| *slot.lock() = Some(result))
    }

    #[tokio::test]
    async fn test_poll_returns_subscribed_records_in_order() {
        let driver = InMemoryDriver::new();
        driver.subscribe("a").unwrap();

        let acks = Arc::new(Mutex::new(None));
        driver.produce(BrokerRecord::new("a", b"1".to_vec()), ack_into(&acks));
        driver.produce(BrokerRecord::new("b", b"x".to_vec()), ack_into(&acks));
        driver.produce(BrokerRecord::new("a", b"2".to_vec()), ack_into(&acks));

        let fetches = driver.poll_fetches().await;
        let payloads: Vec<&[u8]> = fetches.records.iter().map(|r| r.payload.as_slice()).collect();
        assert_eq!(payloads, vec![b"1".as_slice(), b"2".as_slice()]);
        assert_eq!(driver.delivered_count(), 2);
        assert_eq!(driver.produced().len(), 3);
    }

    #[tokio::test]
    async fn test_idle_poll_times_out_empty() {
        let driver = InMemoryDriver::new().with_poll_timeout(Duration::from_millis(10));
        driver.subscribe("a").unwrap();
        assert!(driver.poll_fetches().await.is_empty());
    }

    #[tokio::test]
    async fn test_poll_wakes_on_produce() {
        let driver = Arc::new(InMemoryDriver::new().with_poll_timeout(Duration::from_secs(5)));
        driver.subscribe("a").unwrap();

        let poller = {
            let driver = Arc::clone(&driver);
            tokio::spawn(async move { driver.poll_fetches().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        driver.produce(BrokerRecord::new("a", b"late".to_vec()), Box::new(|_| {}));

        let fetches = tokio::time::timeout(Duration::from_secs(1), poller)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetches.records.len(), 1);
    }

    #[tokio::test]
    async fn test_close_wakes_poll() {
        let driver = Arc::new(InMemoryDriver::new().with_poll_timeout(Duration::from_secs(5)));
        let poller = {
            let driver = Arc::clone(&driver);
            tokio::spawn(async move { driver.poll_fetches().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        driver.close();

        let fetches = tokio::time::timeout(Duration::from_secs(1), poller)
            .await
            .unwrap()
            .unwrap();
        assert!(fetches.is_client_closed());
    }

    #[tokio::test]
    async fn test_injected_faults_fire_once() {
        let driver = InMemoryDriver::new().with_poll_timeout(Duration::from_millis(10));
        driver.subscribe("a").unwrap();

        let acks = Arc::new(Mutex::new(None));
        driver.fail_next_produce("leader not available");
        driver.produce(BrokerRecord::new("a", b"1".to_vec()), ack_into(&acks));
        assert!(matches!(acks.lock().take(), Some(Err(BrokerError::Produce(_)))));

        driver.produce(BrokerRecord::new("a", b"2".to_vec()), ack_into(&acks));
        assert!(matches!(acks.lock().take(), Some(Ok(()))));

        driver.fail_next_poll("coordinator moved");
        assert!(matches!(driver.poll_fetches().await.errors.as_slice(), [BrokerError::Poll(_)]));
        assert_eq!(driver.poll_fetches().await.records.len(), 1);

        driver.fail_next_commit("rebalance in progress");
        assert!(driver.commit_offsets().await.is_err());
        assert!(driver.commit_offsets().await.is_ok());
        assert_eq!(driver.committed_count(), 1);
    }

    #[tokio::test]
    async fn test_produce_after_close_rejected() {
        let driver = InMemoryDriver::new();
        driver.close();

        let acks = Arc::new(Mutex::new(None));
        driver.produce(BrokerRecord::new("a", b"1".to_vec()), ack_into(&acks));
        assert!(matches!(acks.lock().take(), Some(Err(BrokerError::ClientClosed))));
    }
}
