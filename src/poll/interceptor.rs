//! Capture of incoming foreground requests while a scope is active.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::host::{
    Host, HostError, HostId, PendingRequest, RequestHandler, SharedHost, TaskIdentity,
};
use crate::poll::error::PollError;
use crate::poll::registry::{self, OwnershipToken};

/// Where the capturing handler sends a request.
enum Capture {
    Queueing(Vec<PendingRequest>),
    /// Interception ended; late calls through a stale copy of the capturing
    /// handler go to the original one.
    Forwarding(RequestHandler),
}

/// Owns the host's request handler slot for the duration of one activation.
///
/// While active, every request the host delivers is appended to the queue
/// instead of running, and the host identity is put back to the value saved
/// at activation so the arriving request cannot take over output attribution.
pub struct Interceptor {
    host: SharedHost,
    original: RequestHandler,
    saved: TaskIdentity,
    capture: Arc<Mutex<Capture>>,
    token: Mutex<Option<OwnershipToken>>,
}

impl Interceptor {
    pub fn activate(host: SharedHost) -> Result<Self, PollError> {
        let token = registry::claim(host.id())?;
        let saved = host.current_task_identity();
        let capture = Arc::new(Mutex::new(Capture::Queueing(Vec::new())));

        let handler = {
            let capture = capture.clone();
            let weak = Arc::downgrade(&host);
            let saved = saved.clone();
            RequestHandler::immediate(move |request| {
                let late = match &mut *capture.lock() {
                    Capture::Queueing(queue) => {
                        queue.push(request);
                        None
                    }
                    Capture::Forwarding(original) => Some((original.clone(), request)),
                };
                match late {
                    Some((original, request)) => forward(&weak, original, request),
                    None => {
                        if let Some(host) = weak.upgrade() {
                            host.set_current_task_identity(saved.clone());
                        }
                        Ok(())
                    }
                }
            })
        };
        let original = host.install_request_handler(handler);

        tracing::debug!(
            host = %host.id(),
            identity = %saved.identity,
            suspending = original.is_suspending(),
            "Request interception active"
        );

        Ok(Self {
            host,
            original,
            saved,
            capture,
            token: Mutex::new(Some(token)),
        })
    }

    /// Restore the original handler and hand over everything captured.
    ///
    /// Only the first call does anything; later calls return an empty queue.
    /// The host's claim is cleared before returning.
    pub fn deactivate(&self) -> Vec<PendingRequest> {
        self.deactivate_keeping_claim()
            .map(|(deferred, _claim)| deferred)
            .unwrap_or_default()
    }

    /// Like [`deactivate`](Self::deactivate), but the host stays claimed until
    /// the returned token is dropped.
    pub(crate) fn deactivate_keeping_claim(
        &self,
    ) -> Option<(Vec<PendingRequest>, OwnershipToken)> {
        let token = self.token.lock().take()?;

        let deferred = {
            let mut state = self.capture.lock();
            match std::mem::replace(&mut *state, Capture::Forwarding(self.original.clone())) {
                Capture::Queueing(queue) => queue,
                Capture::Forwarding(_) => Vec::new(),
            }
        };
        self.host.restore_request_handler(self.original.clone());

        tracing::debug!(
            host = %self.host.id(),
            deferred = deferred.len(),
            "Request interception ended"
        );
        Some((deferred, token))
    }

    pub fn is_active(&self) -> bool {
        self.token.lock().is_some()
    }

    pub fn host_id(&self) -> HostId {
        self.host.id()
    }

    pub fn original_handler(&self) -> &RequestHandler {
        &self.original
    }

    pub fn saved_identity(&self) -> &TaskIdentity {
        &self.saved
    }

    pub fn deferred_len(&self) -> usize {
        match &*self.capture.lock() {
            Capture::Queueing(queue) => queue.len(),
            Capture::Forwarding(_) => 0,
        }
    }
}

/// Run a request that reached the capturing handler after deactivation.
fn forward(
    host: &Weak<dyn Host>,
    original: RequestHandler,
    request: PendingRequest,
) -> Result<(), HostError> {
    match original {
        RequestHandler::Immediate(f) => f(request),
        RequestHandler::Suspending(f) => {
            let host = host
                .upgrade()
                .ok_or_else(|| HostError::NotRunning("host is gone".into()))?;
            let host_id = host.id();
            host.schedule(Box::pin(async move {
                if let Err(e) = f(request).await {
                    tracing::warn!(host = %host_id, error = %e, "Late request failed");
                }
            }))
        }
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("host", &self.host.id())
            .field("active", &self.is_active())
            .field("deferred", &self.deferred_len())
            .finish()
    }
}
