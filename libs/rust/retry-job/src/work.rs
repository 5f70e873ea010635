//! Failed work and the collaborators that list and retry it.

use crate::JobError;
use async_trait::async_trait;
use std::fmt;

/// Processing state of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkStatus {
    /// Not yet attempted
    Pending,
    /// Attempted and failed; eligible for retry
    Failed,
    /// Processed successfully
    Completed,
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Snapshot of one unit of work, as listed by a [`WorkSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Stable id; also the lease key
    pub id: String,
    /// Status at listing time
    pub status: WorkStatus,
}

impl WorkItem {
    /// A failed item with `id`.
    #[must_use]
    pub fn failed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: WorkStatus::Failed,
        }
    }

    /// Whether the snapshot says the item failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == WorkStatus::Failed
    }
}

/// Source of truth for work item status.
#[async_trait]
pub trait WorkSource: Send + Sync {
    /// Items currently marked failed.
    async fn list_failed(&self) -> Result<Vec<WorkItem>, JobError>;

    /// Re-read `item` and report whether it is still failed.
    async fn is_still_failed(&self, item: &WorkItem) -> Result<bool, JobError>;
}

/// The business action performed on a failed item.
#[async_trait]
pub trait RetryAction: Send + Sync {
    /// Retry `item`.
    async fn retry(&self, item: &WorkItem) -> anyhow::Result<()>;
}
