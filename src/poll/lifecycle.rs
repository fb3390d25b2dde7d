//! One activation of the poll machinery, from claim to replay.
//!
//! An activation ends exactly once: on explicit release, when its scope is
//! dropped, or when the host reports the foreground task finished, whichever
//! comes first. Ending it restores the host handler and schedules replay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::host::{HookId, HostId, SharedHost, TaskIdentity};
use crate::poll::error::PollError;
use crate::poll::interceptor::Interceptor;
use crate::poll::replay::{Replay, ReplayPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Released,
    Dropped,
    Exhausted,
    TaskCompleted,
}

pub(crate) struct Activation {
    host: SharedHost,
    interceptor: Interceptor,
    policy: ReplayPolicy,
    hook: Mutex<Option<HookId>>,
    finished: AtomicBool,
    bridge_live: AtomicBool,
}

impl Activation {
    pub(crate) fn start(host: SharedHost, policy: ReplayPolicy) -> Result<Arc<Self>, PollError> {
        let interceptor = Interceptor::activate(host.clone())?;
        let activation = Arc::new(Self {
            host: host.clone(),
            interceptor,
            policy,
            hook: Mutex::new(None),
            finished: AtomicBool::new(false),
            bridge_live: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&activation);
        let hook = host.on_task_completed(Box::new(move || {
            if let Some(activation) = weak.upgrade() {
                activation.finish(FinishReason::TaskCompleted);
            }
        }));
        *activation.hook.lock() = Some(hook);

        Ok(activation)
    }

    /// End the activation and schedule replay. Returns false if it had already ended.
    pub(crate) fn finish(&self, reason: FinishReason) -> bool {
        if self.finished.swap(true, Ordering::AcqRel) {
            return false;
        }

        let hook = self.hook.lock().take();
        if let Some(hook) = hook {
            self.host.remove_task_completed_hook(hook);
        }

        let Some((deferred, claim)) = self.interceptor.deactivate_keeping_claim() else {
            return true;
        };
        tracing::debug!(
            host = %self.host.id(),
            ?reason,
            deferred = deferred.len(),
            "Poll scope finished"
        );
        if deferred.is_empty() {
            return true;
        }

        // The host stays claimed until the replay task is done with the queue.
        let count = deferred.len();
        let replay = Replay::new(
            self.host.clone(),
            self.interceptor.original_handler().clone(),
            self.policy,
        )
        .holding(claim);
        if let Err(e) = replay.schedule(deferred) {
            tracing::warn!(
                host = %self.host.id(),
                error = %e,
                dropped = count,
                "Could not schedule replay; deferred requests will not run"
            );
        }
        true
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.finished.load(Ordering::Acquire)
    }

    pub(crate) fn host(&self) -> &SharedHost {
        &self.host
    }

    pub(crate) fn host_id(&self) -> HostId {
        self.interceptor.host_id()
    }

    pub(crate) fn saved_identity(&self) -> &TaskIdentity {
        self.interceptor.saved_identity()
    }

    pub(crate) fn deferred_len(&self) -> usize {
        self.interceptor.deferred_len()
    }

    /// Mark a blocking bridge as live. Fails if one already is.
    pub(crate) fn claim_bridge(&self) -> Result<(), PollError> {
        self.bridge_live
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| PollError::NestingNotSupported)
    }

    pub(crate) fn release_bridge(&self) {
        self.bridge_live.store(false, Ordering::Release);
    }
}
