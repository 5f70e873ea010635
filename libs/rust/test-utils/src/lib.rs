//! Shared test utilities for relay platform Rust libraries.
//!
//! This crate provides:
//! - Proptest generators for domain inputs
//! - Recording and counting test doubles for the platform traits
//! - Test fixtures with sample data

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
