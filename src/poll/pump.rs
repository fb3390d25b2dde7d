//! Bounded rounds of host loop work.

use std::sync::Arc;

use crate::host::SharedHost;
use crate::poll::context::ContextGuard;
use crate::poll::error::PollError;
use crate::poll::lifecycle::Activation;

/// Runs host loop iterations, restoring the saved identity after each one.
///
/// A pump tied to an activation stops restoring once that activation has
/// ended, since the identity then belongs to whatever the host runs next.
#[derive(Clone)]
pub struct Pump {
    host: SharedHost,
    guard: ContextGuard,
    activation: Option<Arc<Activation>>,
}

impl Pump {
    pub fn new(host: SharedHost, guard: ContextGuard) -> Self {
        Self {
            host,
            guard,
            activation: None,
        }
    }

    pub(crate) fn for_activation(activation: Arc<Activation>) -> Self {
        let host = activation.host().clone();
        let guard = ContextGuard::new(host.clone(), activation.saved_identity().clone());
        Self {
            host,
            guard,
            activation: Some(activation),
        }
    }

    fn owns_identity(&self) -> bool {
        self.activation.as_ref().map_or(true, |a| a.is_active())
    }

    /// Run exactly `n` loop iterations.
    ///
    /// An iteration with nothing to do counts as done. Any other host failure
    /// stops the pump and is returned once identity has been restored.
    pub async fn pump(&self, n: usize) -> Result<(), PollError> {
        for _ in 0..n {
            let result = self.host.run_one_loop_iteration().await;
            if self.owns_identity() {
                self.guard.restore();
            }
            match result {
                Ok(()) => {}
                Err(e) if e.is_benign() => {
                    tracing::trace!(host = %self.host.id(), "Loop iteration had no work");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn guard(&self) -> &ContextGuard {
        &self.guard
    }
}
