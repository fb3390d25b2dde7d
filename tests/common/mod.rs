//! Shared test utilities for ui-poll
//!
//! Request builders and journal helpers used across the integration tests.

pub mod fixtures;
