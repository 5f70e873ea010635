//! Periodic retry sweep.
//!
//! Every interval the coordinator lists failed work and, per item:
//! acquires a lease keyed by the item id, re-checks the item's status
//! under the lease, retries it if it is still failed and releases the
//! lease. Items whose lease cannot be taken are skipped until the next
//! sweep.

use crate::{DistributedLock, RetryAction, WorkItem, WorkSource};
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Retry job configuration.
#[derive(Debug, Clone)]
pub struct RetryJobConfig {
    /// Time between sweeps (default: 5 minutes)
    pub interval: Duration,
    /// Lease lifetime per item (default: 60s)
    pub lease_ttl: Duration,
}

impl Default for RetryJobConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            lease_ttl: Duration::from_secs(60),
        }
    }
}

impl RetryJobConfig {
    /// Set the sweep interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the lease lifetime.
    #[must_use]
    pub const fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }
}

/// What happened to one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The retry action ran and succeeded
    Retried,
    /// The item was no longer failed once the lease was held
    AlreadyProcessed,
    /// The lease could not be acquired; skipped this sweep
    LeaseUnavailable,
    /// The status re-check failed; skipped this sweep
    StatusCheckFailed,
    /// The retry action returned an error or panicked
    RetryFailed,
}

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Items listed as failed
    pub listed: usize,
    /// Items retried successfully
    pub retried: usize,
    /// Items found already processed
    pub already_processed: usize,
    /// Items skipped for lack of a lease
    pub lease_unavailable: usize,
    /// Items whose re-check or retry failed
    pub failed: usize,
    /// Whether listing itself failed
    pub listing_failed: bool,
}

impl SweepReport {
    fn record(&mut self, outcome: ProcessOutcome) {
        match outcome {
            ProcessOutcome::Retried => self.retried += 1,
            ProcessOutcome::AlreadyProcessed => self.already_processed += 1,
            ProcessOutcome::LeaseUnavailable => self.lease_unavailable += 1,
            ProcessOutcome::StatusCheckFailed | ProcessOutcome::RetryFailed => self.failed += 1,
        }
    }
}

struct Worker {
    lock: Arc<dyn DistributedLock>,
    source: Arc<dyn WorkSource>,
    action: Arc<dyn RetryAction>,
    lease_ttl: Duration,
}

impl Worker {
    async fn sweep(&self) -> SweepReport {
        debug!("Starting retry sweep");
        let mut report = SweepReport::default();

        let items = match self.source.list_failed().await {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "Failed to list failed work items");
                report.listing_failed = true;
                return report;
            }
        };

        report.listed = items.len();
        for item in &items {
            report.record(self.process_single(item).await);
        }

        info!(
            listed = report.listed,
            retried = report.retried,
            already_processed = report.already_processed,
            lease_unavailable = report.lease_unavailable,
            failed = report.failed,
            "Finished retry sweep"
        );
        report
    }

    async fn process_single(&self, item: &WorkItem) -> ProcessOutcome {
        let lease = match self.lock.acquire(&item.id, self.lease_ttl).await {
            Ok(lease) => lease,
            Err(e) => {
                error!(item_id = %item.id, error = %e, "Failed to obtain lease");
                return ProcessOutcome::LeaseUnavailable;
            }
        };

        let outcome = self.process_leased(item).await;

        if let Err(e) = self.lock.release(&lease).await {
            error!(item_id = %item.id, error = %e, "Failed to release lease");
        }
        outcome
    }

    async fn process_leased(&self, item: &WorkItem) -> ProcessOutcome {
        match self.source.is_still_failed(item).await {
            Err(e) => {
                error!(item_id = %item.id, error = %e, "Failed to re-check work item");
                ProcessOutcome::StatusCheckFailed
            }
            Ok(false) => {
                debug!(item_id = %item.id, "Work item already processed");
                ProcessOutcome::AlreadyProcessed
            }
            Ok(true) => {
                debug!(item_id = %item.id, "Retrying work item");
                match AssertUnwindSafe(self.action.retry(item)).catch_unwind().await {
                    Ok(Ok(())) => ProcessOutcome::Retried,
                    Ok(Err(e)) => {
                        error!(item_id = %item.id, error = %e, "Retry action failed");
                        ProcessOutcome::RetryFailed
                    }
                    Err(_) => {
                        error!(item_id = %item.id, "Retry action panicked");
                        ProcessOutcome::RetryFailed
                    }
                }
            }
        }
    }
}

struct Running {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Runs the retry sweep on a fixed interval.
///
/// `Stopped -> Running` on [`start`](Self::start), `Running -> Stopped` on
/// [`stop`](Self::stop). Starting twice is a logged no-op and stopping is
/// idempotent.
pub struct RetryCoordinator {
    worker: Arc<Worker>,
    interval: Duration,
    running: Mutex<Option<Running>>,
}

impl RetryCoordinator {
    /// A stopped coordinator.
    #[must_use]
    pub fn new(
        lock: Arc<dyn DistributedLock>,
        source: Arc<dyn WorkSource>,
        action: Arc<dyn RetryAction>,
        config: RetryJobConfig,
    ) -> Self {
        Self {
            worker: Arc::new(Worker {
                lock,
                source,
                action,
                lease_ttl: config.lease_ttl,
            }),
            interval: config.interval,
            running: Mutex::new(None),
        }
    }

    /// Start sweeping in the background. The first sweep runs one interval
    /// from now.
    ///
    /// Returns `false` without doing anything if already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.is_some() {
            warn!("Retry job is already running");
            return false;
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let worker = Arc::clone(&self.worker);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        worker.sweep().await;
                    }
                }
            }
            debug!("Retry job loop exited");
        });

        info!(interval_secs = interval.as_secs(), "Retry job started");
        *running = Some(Running {
            stop: stop_tx,
            handle,
        });
        true
    }

    /// Stop scheduling sweeps.
    ///
    /// A sweep already in progress runs to completion; await the returned
    /// handle to wait for it. Returns `None` if not running.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let running = self.running.lock().take()?;
        // the loop may already have exited
        let _ = running.stop.send(());
        info!("Retry job stopped");
        Some(running.handle)
    }

    /// Whether the sweep loop is scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Run one sweep now, independent of the schedule.
    pub async fn sweep_once(&self) -> SweepReport {
        self.worker.sweep().await
    }

    /// Lease, re-check and retry one item.
    pub async fn process_single(&self, item: &WorkItem) -> ProcessOutcome {
        self.worker.process_single(item).await
    }
}

impl Drop for RetryCoordinator {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            let _ = running.stop.send(());
        }
    }
}
