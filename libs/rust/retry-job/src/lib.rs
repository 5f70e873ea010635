//! Distributed periodic retry of failed work.
//!
//! [`RetryCoordinator`] sweeps a [`WorkSource`] on a fixed interval and
//! retries each failed item under a [`DistributedLock`] lease, so at most
//! one node works on an item at a time. [`RedisLock`] backs the lease in
//! production; [`InMemoryLock`] backs it in tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coordinator;
pub mod error;
pub mod lock;
pub mod memory_lock;
pub mod redis_lock;
pub mod work;

pub use coordinator::{ProcessOutcome, RetryCoordinator, RetryJobConfig, SweepReport};
pub use error::{JobError, LockError};
pub use lock::{DistributedLease, DistributedLock};
pub use memory_lock::InMemoryLock;
pub use redis_lock::{RedisLock, RedisLockConfig};
pub use work::{RetryAction, WorkItem, WorkSource, WorkStatus};
