//! Graceful shutdown.
//!
//! Services register terminators (close the broker client, stop background
//! jobs) and run them together once a termination signal arrives.

use crate::PlatformError;
use futures::future::{BoxFuture, join_all};
use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

struct Terminator {
    name: &'static str,
    future: BoxFuture<'static, Result<(), PlatformError>>,
}

/// Result of running the registered terminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Terminators that finished successfully
    pub completed: usize,
    /// Terminators that returned an error
    pub failed: usize,
    /// Whether the timeout elapsed before all terminators finished
    pub timed_out: bool,
}

/// Collects terminators and runs them concurrently on shutdown.
#[derive(Default)]
pub struct ShutdownCoordinator {
    terminators: Vec<Terminator>,
}

impl ShutdownCoordinator {
    /// Creates an empty coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a terminator to run on shutdown.
    pub fn register<F>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), PlatformError>> + Send + 'static,
    {
        self.terminators.push(Terminator {
            name,
            future: Box::pin(future),
        });
    }

    /// Number of registered terminators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terminators.len()
    }

    /// Whether no terminator is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terminators.is_empty()
    }

    /// Runs every terminator concurrently, bounded by `timeout`.
    ///
    /// Failures are logged and counted, never propagated.
    pub async fn shutdown(self, timeout: Duration) -> ShutdownReport {
        info!(terminators = self.terminators.len(), "Performing pre-shutdown terminations");

        let total = self.terminators.len();
        let runs = self.terminators.into_iter().map(|t| async move {
            let result = t.future.await;
            if let Err(e) = &result {
                error!(terminator = t.name, error = %e, "Failed to terminate a resource");
            }
            result.is_ok()
        });

        match tokio::time::timeout(timeout, join_all(runs)).await {
            Ok(results) => {
                let completed = results.iter().filter(|ok| **ok).count();
                info!("Shutdown complete");
                ShutdownReport {
                    completed,
                    failed: total - completed,
                    timed_out: false,
                }
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis(), "Shutdown timeout reached");
                ShutdownReport {
                    completed: 0,
                    failed: 0,
                    timed_out: true,
                }
            }
        }
    }
}

/// Waits for SIGTERM or SIGINT.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
