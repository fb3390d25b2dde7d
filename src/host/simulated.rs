//! In-memory host for deterministic testing and demos
//!
//! Implements the [`Host`] trait over a plain event queue instead of a real
//! kernel loop. Requests, UI callbacks and scheduled tasks are processed one
//! per `run_one_loop_iteration`, and everything observable (executed
//! requests, abort replies, handler swaps, flushes) is recorded in a journal
//! for later verification.
//!
//! # Example
//! ```no_run
//! use ui_poll::host::SimulatedHost;
//! use ui_poll::PendingRequest;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_flow() {
//!     let host = SimulatedHost::new();
//!     host.push_request(PendingRequest::new("shell", "client", json!({ "msg_id": "r1" })));
//!     host.run_until_idle().await.unwrap();
//!     assert_eq!(host.executed(), vec!["r1".to_string()]);
//! }
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::host::error::HostError;
use crate::host::handler::RequestHandler;
use crate::host::types::{HookId, HostId, PendingRequest, TaskIdentity};
use crate::host::{CompletionHook, Host};

static NEXT_HOST_ID: AtomicU64 = AtomicU64::new(1);

/// Something observable the simulated host did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    HandlerInstalled,
    HandlerRestored,
    /// A request ran through the host's own handler.
    Executed { message_id: String, identity: String },
    AbortReplied { message_id: String },
    /// A UI callback ran; `identity` is what its output was attributed to.
    Callback { name: String, identity: String },
    Flushed,
    IdlePublished,
}

type Callback = Box<dyn FnOnce(&SimulatedHost) + Send>;

enum HostEvent {
    Request(PendingRequest),
    Callback { name: String, run: Callback },
    Task(BoxFuture<'static, ()>),
}

/// A cooperative host whose loop is an in-memory event queue.
pub struct SimulatedHost {
    id: HostId,
    handler: Mutex<RequestHandler>,
    identity: Mutex<TaskIdentity>,
    events: Mutex<VecDeque<HostEvent>>,
    hooks: Mutex<Vec<(HookId, CompletionHook)>>,
    next_hook: AtomicU64,
    aborted: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
    injected_failure: Mutex<Option<HostError>>,
    loop_running: AtomicBool,
    iterations: AtomicUsize,
    journal: Mutex<Vec<JournalEntry>>,
}

impl SimulatedHost {
    /// Create a host whose own request handler completes immediately.
    pub fn new() -> Arc<Self> {
        Self::build(false)
    }

    /// Create a host whose own request handler suspends before executing.
    pub fn with_suspending_handler() -> Arc<Self> {
        Self::build(true)
    }

    fn build(suspending: bool) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<SimulatedHost>| {
            let weak = weak.clone();
            let handler = if suspending {
                RequestHandler::suspending(move |request| {
                    let weak = weak.clone();
                    async move {
                        tokio::task::yield_now().await;
                        match weak.upgrade() {
                            Some(host) => host.execute(&request),
                            None => Err(HostError::NotRunning("host dropped".into())),
                        }
                    }
                })
            } else {
                RequestHandler::immediate(move |request| match weak.upgrade() {
                    Some(host) => host.execute(&request),
                    None => Err(HostError::NotRunning("host dropped".into())),
                })
            };

            Self {
                id: HostId(NEXT_HOST_ID.fetch_add(1, Ordering::Relaxed)),
                handler: Mutex::new(handler),
                identity: Mutex::new(TaskIdentity::default()),
                events: Mutex::new(VecDeque::new()),
                hooks: Mutex::new(Vec::new()),
                next_hook: AtomicU64::new(1),
                aborted: Mutex::new(HashSet::new()),
                failing: Mutex::new(HashSet::new()),
                injected_failure: Mutex::new(None),
                loop_running: AtomicBool::new(true),
                iterations: AtomicUsize::new(0),
                journal: Mutex::new(Vec::new()),
            }
        })
    }

    fn execute(&self, request: &PendingRequest) -> Result<(), HostError> {
        let message_id = request.message_id().unwrap_or_default().to_string();
        if self.failing.lock().contains(&message_id) {
            return Err(HostError::Dispatch(format!("{message_id} failed")));
        }
        let identity = self.identity.lock().identity.clone();
        self.record(JournalEntry::Executed {
            message_id,
            identity,
        });
        Ok(())
    }

    fn record(&self, entry: JournalEntry) {
        self.journal.lock().push(entry);
    }

    /// Queue an incoming foreground request, as if a client had sent it.
    pub fn push_request(&self, request: PendingRequest) {
        self.events.lock().push_back(HostEvent::Request(request));
    }

    /// Queue a UI callback.
    pub fn push_callback<F>(&self, name: impl Into<String>, run: F)
    where
        F: FnOnce(&SimulatedHost) + Send + 'static,
    {
        self.events.lock().push_back(HostEvent::Callback {
            name: name.into(),
            run: Box::new(run),
        });
    }

    /// Flag the request with this message id as cancelled upstream.
    pub fn mark_aborted(&self, message_id: impl Into<String>) {
        self.aborted.lock().insert(message_id.into());
    }

    /// Make the host's own handler fail when it executes this message id.
    pub fn fail_dispatch(&self, message_id: impl Into<String>) {
        self.failing.lock().insert(message_id.into());
    }

    /// Make the next loop iteration fail with `error`.
    pub fn fail_next_iteration(&self, error: HostError) {
        *self.injected_failure.lock() = Some(error);
    }

    /// Simulate a host whose loop is not running, so `schedule` is refused.
    pub fn set_loop_running(&self, running: bool) {
        self.loop_running.store(running, Ordering::SeqCst);
    }

    /// Fire and clear every completion hook.
    pub fn complete_task(&self) {
        let hooks = std::mem::take(&mut *self.hooks.lock());
        for (_, hook) in hooks {
            hook();
        }
    }

    /// Run loop iterations until one reports no work. Returns how many ran.
    pub async fn run_until_idle(&self) -> Result<usize, HostError> {
        let mut processed = 0;
        loop {
            match self.run_one_loop_iteration().await {
                Ok(()) => processed += 1,
                Err(HostError::NoWorkAvailable) => return Ok(processed),
                Err(e) => return Err(e),
            }
        }
    }

    /// Total calls to `run_one_loop_iteration`, including empty ones.
    pub fn iterations(&self) -> usize {
        self.iterations.load(Ordering::SeqCst)
    }

    pub fn pending_events(&self) -> usize {
        self.events.lock().len()
    }

    pub fn completion_hooks(&self) -> usize {
        self.hooks.lock().len()
    }

    pub fn handler_is_suspending(&self) -> bool {
        self.handler.lock().is_suspending()
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.journal.lock().clone()
    }

    /// Message ids executed through the host's own handler, in order.
    pub fn executed(&self) -> Vec<String> {
        self.journal
            .lock()
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Executed { message_id, .. } => Some(message_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Message ids acknowledged as aborted, in order.
    pub fn abort_replies(&self) -> Vec<String> {
        self.journal
            .lock()
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::AbortReplied { message_id } => Some(message_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }
}

#[async_trait]
impl Host for SimulatedHost {
    fn id(&self) -> HostId {
        self.id
    }

    fn install_request_handler(&self, handler: RequestHandler) -> RequestHandler {
        let previous = std::mem::replace(&mut *self.handler.lock(), handler);
        self.record(JournalEntry::HandlerInstalled);
        previous
    }

    fn restore_request_handler(&self, previous: RequestHandler) {
        *self.handler.lock() = previous;
        self.record(JournalEntry::HandlerRestored);
    }

    fn current_task_identity(&self) -> TaskIdentity {
        self.identity.lock().clone()
    }

    fn set_current_task_identity(&self, identity: TaskIdentity) {
        *self.identity.lock() = identity;
    }

    async fn run_one_loop_iteration(&self) -> Result<(), HostError> {
        self.iterations.fetch_add(1, Ordering::SeqCst);
        let injected = self.injected_failure.lock().take();
        if let Some(error) = injected {
            return Err(error);
        }

        let event = self.events.lock().pop_front();
        match event {
            None => Err(HostError::NoWorkAvailable),
            Some(HostEvent::Request(request)) => {
                // The loop attributes output to the arriving request before handing it off.
                self.set_current_task_identity(request.task_identity());
                let handler = self.handler.lock().clone();
                handler.call(request).await
            }
            Some(HostEvent::Callback { name, run }) => {
                let identity = self.identity.lock().identity.clone();
                self.record(JournalEntry::Callback { name, identity });
                run(self);
                Ok(())
            }
            Some(HostEvent::Task(task)) => {
                task.await;
                Ok(())
            }
        }
    }

    fn is_aborted(&self, request: &PendingRequest) -> bool {
        request
            .message_id()
            .is_some_and(|id| self.aborted.lock().contains(id))
    }

    async fn send_abort_reply(&self, request: &PendingRequest) -> Result<(), HostError> {
        self.record(JournalEntry::AbortReplied {
            message_id: request.message_id().unwrap_or_default().to_string(),
        });
        Ok(())
    }

    fn on_task_completed(&self, hook: CompletionHook) -> HookId {
        let id = HookId(self.next_hook.fetch_add(1, Ordering::Relaxed));
        self.hooks.lock().push((id, hook));
        id
    }

    fn remove_task_completed_hook(&self, id: HookId) {
        self.hooks.lock().retain(|(hook_id, _)| *hook_id != id);
    }

    fn flush_output_streams(&self) {
        self.record(JournalEntry::Flushed);
    }

    fn publish_idle_status(&self) {
        self.record(JournalEntry::IdlePublished);
    }

    fn schedule(&self, task: BoxFuture<'static, ()>) -> Result<(), HostError> {
        if !self.loop_running.load(Ordering::SeqCst) {
            return Err(HostError::NotRunning(format!("{} loop is stopped", self.id)));
        }
        self.events.lock().push_back(HostEvent::Task(task));
        Ok(())
    }
}
