//! Cross-crate integration tests for the relay platform libraries.
//!
//! The tests live under `tests/`; this crate has no public API.

#![forbid(unsafe_code)]
