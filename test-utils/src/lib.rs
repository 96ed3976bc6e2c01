//! Shared test utilities for the DVLS client.
//!
//! This crate provides:
//! - Proptest generators for entries and vaults
//! - A wiremock backed DVLS double
//! - JSON fixtures shaped like real server responses
//! - Log output routed to the test harness

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod mocks;

pub use generators::*;
pub use logging::init_test_tracing;
pub use mocks::MockDvls;
