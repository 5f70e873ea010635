//! Property-based tests for relay-retry-job crate.

use async_trait::async_trait;
use proptest::prelude::*;
use relay_retry_job::{
    DistributedLock, InMemoryLock, JobError, RetryAction, RetryCoordinator, RetryJobConfig,
    WorkItem, WorkSource,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct FixedSource(Vec<String>);

#[async_trait]
impl WorkSource for FixedSource {
    async fn list_failed(&self) -> Result<Vec<WorkItem>, JobError> {
        Ok(self.0.iter().cloned().map(WorkItem::failed).collect())
    }

    async fn is_still_failed(&self, _item: &WorkItem) -> Result<bool, JobError> {
        Ok(true)
    }
}

#[derive(Default)]
struct Counter(AtomicUsize);

#[async_trait]
impl RetryAction for Counter {
    async fn retry(&self, _item: &WorkItem) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Held items are skipped, everything else is retried, and no lease
    /// outlives the sweep.
    #[test]
    fn prop_sweep_skips_exactly_the_held_items(
        held in proptest::collection::vec(any::<bool>(), 0..20),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ids: Vec<String> = (0..held.len()).map(|i| format!("tx-{i}")).collect();
            let lock = Arc::new(InMemoryLock::new());
            for (id, is_held) in ids.iter().zip(&held) {
                if *is_held {
                    lock.hold_elsewhere(id, Duration::from_secs(60));
                }
            }
            let action = Arc::new(Counter::default());
            let job = RetryCoordinator::new(
                Arc::clone(&lock) as Arc<dyn DistributedLock>,
                Arc::new(FixedSource(ids.clone())),
                Arc::clone(&action) as Arc<dyn RetryAction>,
                RetryJobConfig::default(),
            );

            let report = job.sweep_once().await;
            let held_count = held.iter().filter(|h| **h).count();

            prop_assert_eq!(report.listed, ids.len());
            prop_assert_eq!(report.lease_unavailable, held_count);
            prop_assert_eq!(report.retried, ids.len() - held_count);
            prop_assert_eq!(action.0.load(Ordering::SeqCst), ids.len() - held_count);
            prop_assert_eq!(lock.release_count(), ids.len() - held_count);
            Ok(())
        })?;
    }
}
