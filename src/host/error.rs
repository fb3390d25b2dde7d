//! Host interaction errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The loop had nothing to process this iteration.
    #[error("No event available")]
    NoWorkAvailable,
    /// The request was cancelled upstream.
    #[error("Request aborted: {0}")]
    Aborted(String),
    #[error("Dispatch failed: {0}")]
    Dispatch(String),
    #[error("Host loop failed: {0}")]
    Loop(String),
    #[error("Host loop is not running: {0}")]
    NotRunning(String),
}

impl HostError {
    /// Whether the pump should treat this as an iteration that produced no work.
    pub fn is_benign(&self) -> bool {
        matches!(self, HostError::NoWorkAvailable)
    }
}
