use thiserror::Error;

use crate::host::{HostError, HostId};

#[derive(Error, Debug)]
pub enum PollError {
    #[error("A poll scope is already active on {0}")]
    AlreadyActive(HostId),
    #[error("A blocking poller is already live for this scope")]
    NestingNotSupported,
    #[error("Blocking polling cannot run inside an async runtime; use the async poll instead")]
    InsideRuntime,
    #[error("Blocking poller worker is gone")]
    BridgeClosed,
    #[error("Failed to start blocking poller: {0}")]
    Bridge(String),
    #[error(transparent)]
    Host(#[from] HostError),
}
