//! Retry job errors.

use thiserror::Error;

/// Errors raised by a [`DistributedLock`](crate::DistributedLock).
#[derive(Error, Debug)]
pub enum LockError {
    /// Another holder owns the lease
    #[error("lock {key} is held by another owner")]
    Held {
        /// Lock key
        key: String,
    },

    /// The lease expired or was taken over before release
    #[error("lock {key} is no longer held by this lease")]
    NotHeld {
        /// Lock key
        key: String,
    },

    /// The lock service failed
    #[error("lock backend error: {0}")]
    Backend(String),

    /// Redis reported an error
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl LockError {
    /// Create a backend error.
    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Errors raised by a [`WorkSource`](crate::WorkSource).
#[derive(Error, Debug)]
pub enum JobError {
    /// The work source could not be read
    #[error("work source error: {0}")]
    Source(String),
}

impl JobError {
    /// Create a work source error.
    #[must_use]
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}
