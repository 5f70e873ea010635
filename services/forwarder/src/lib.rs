//! Forwarder service library.
//!
//! Consumes one-requests from the broker, wraps each in a three-request
//! with a fresh unique id and posts it to the downstream API using a cached
//! client-credentials token.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod downstream;
pub mod error;
pub mod handler;
pub mod model;

// Re-exports for convenience
pub use app::Application;
pub use config::Config;
pub use error::ForwarderError;
