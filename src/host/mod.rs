//! The host capability interface.
//!
//! The poll machinery never talks to an event loop directly. Everything it
//! needs from the host (the request handler slot, the ambient task identity,
//! one loop iteration, abort detection, completion hooks and output
//! bookkeeping) goes through [`Host`].

pub mod error;
pub mod handler;
pub mod simulated;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

pub use error::HostError;
pub use handler::RequestHandler;
pub use simulated::{JournalEntry, SimulatedHost};
pub use types::{HookId, HostId, PendingRequest, TaskIdentity};

/// One-shot callback fired when the host finishes the current foreground task.
pub type CompletionHook = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle to a host.
pub type SharedHost = Arc<dyn Host>;

/// Capabilities a cooperative, single-threaded host exposes to the poll core.
#[async_trait]
pub trait Host: Send + Sync {
    /// Identity of this host within the process.
    fn id(&self) -> HostId;

    /// Install `handler` for incoming foreground requests, returning the previous one.
    fn install_request_handler(&self, handler: RequestHandler) -> RequestHandler;

    /// Put a previously returned handler back into the slot.
    fn restore_request_handler(&self, previous: RequestHandler);

    fn current_task_identity(&self) -> TaskIdentity;

    fn set_current_task_identity(&self, identity: TaskIdentity);

    /// Process one unit of loop work.
    ///
    /// Returns [`HostError::NoWorkAvailable`] when there was nothing to do.
    async fn run_one_loop_iteration(&self) -> Result<(), HostError>;

    /// Whether `request` was cancelled upstream while it waited.
    fn is_aborted(&self, request: &PendingRequest) -> bool;

    /// Acknowledge `request` as aborted instead of executing it.
    async fn send_abort_reply(&self, request: &PendingRequest) -> Result<(), HostError>;

    /// Register a one-shot hook fired when the current foreground task completes.
    fn on_task_completed(&self, hook: CompletionHook) -> HookId;

    fn remove_task_completed_hook(&self, id: HookId);

    fn flush_output_streams(&self);

    fn publish_idle_status(&self);

    /// Run `task` detached on the host loop.
    fn schedule(&self, task: BoxFuture<'static, ()>) -> Result<(), HostError>;
}
