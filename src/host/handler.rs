use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::host::error::HostError;
use crate::host::types::PendingRequest;

type ImmediateFn = dyn Fn(PendingRequest) -> Result<(), HostError> + Send + Sync;
type SuspendingFn = dyn Fn(PendingRequest) -> BoxFuture<'static, Result<(), HostError>> + Send + Sync;

/// The host's request handler slot.
///
/// Whether a handler completes immediately or must be awaited is decided once,
/// when the handler is built, rather than probed on every call.
#[derive(Clone)]
pub enum RequestHandler {
    Immediate(Arc<ImmediateFn>),
    Suspending(Arc<SuspendingFn>),
}

impl RequestHandler {
    pub fn immediate<F>(f: F) -> Self
    where
        F: Fn(PendingRequest) -> Result<(), HostError> + Send + Sync + 'static,
    {
        RequestHandler::Immediate(Arc::new(f))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn(PendingRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HostError>> + Send + 'static,
    {
        RequestHandler::Suspending(Arc::new(move |request| f(request).boxed()))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, RequestHandler::Suspending(_))
    }

    /// Run the handler on `request`, awaiting it if it suspends.
    pub async fn call(&self, request: PendingRequest) -> Result<(), HostError> {
        match self {
            RequestHandler::Immediate(f) => f(request),
            RequestHandler::Suspending(f) => f(request).await,
        }
    }
}

impl fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestHandler::Immediate(_) => f.write_str("RequestHandler::Immediate"),
            RequestHandler::Suspending(_) => f.write_str("RequestHandler::Suspending"),
        }
    }
}
