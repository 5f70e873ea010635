//! Shared library for cross-cutting concerns in relay-platform Rust services.
//!
//! This crate provides centralized implementations for:
//! - Error types with retryability classification
//! - Attempt-bounded retry policies with exponential backoff
//! - An injectable wall clock
//! - HTTP client configuration and building
//! - Environment-driven configuration helpers
//! - Structured logging setup
//! - Graceful shutdown coordination

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod env;
pub mod error;
pub mod http;
pub mod retry;
pub mod shutdown;
pub mod tracing_config;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::PlatformError;
pub use http::{HttpConfig, build_http_client};
pub use retry::{RetryConfig, RetryPolicy, Retryable};
pub use shutdown::{ShutdownCoordinator, ShutdownReport, wait_for_signal};
pub use tracing_config::{LogFormat, TracingConfig, init_tracing};
