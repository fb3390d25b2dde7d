//! Integration tests for ui-poll
//!
//! These tests drive a `SimulatedHost` through the public API the way a
//! foreground computation would.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod scope_lifecycle;
pub mod sequence_flow;
