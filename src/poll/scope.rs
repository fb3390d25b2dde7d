//! The acquire/release surface for foreground computations.

use std::sync::Arc;

use crate::host::{HostId, SharedHost, TaskIdentity};
use crate::poll::bridge::BlockingPoller;
use crate::poll::error::PollError;
use crate::poll::lifecycle::{Activation, FinishReason};
use crate::poll::pump::Pump;
use crate::poll::replay::ReplayPolicy;

/// A live interception on one host.
///
/// While the scope exists, foreground requests reaching the host are deferred,
/// and [`poll`](Self::poll) lets the host loop service everything else. The
/// scope ends on [`release`](Self::release) or drop, including drop during
/// panic unwinding, at which point deferred requests are scheduled for replay.
///
/// ```no_run
/// # use ui_poll::{host::SimulatedHost, PollScope};
/// # async fn example() -> Result<(), ui_poll::PollError> {
/// let host = SimulatedHost::new();
/// let scope = PollScope::acquire(host.clone())?;
/// for _ in 0..10 {
///     // ... a slice of foreground work ...
///     scope.poll(4).await?;
/// }
/// scope.release();
/// # Ok(())
/// # }
/// ```
pub struct PollScope {
    activation: Arc<Activation>,
    pump: Pump,
}

impl PollScope {
    pub fn acquire(host: SharedHost) -> Result<Self, PollError> {
        Self::acquire_with(host, ReplayPolicy::default())
    }

    pub fn acquire_with(host: SharedHost, policy: ReplayPolicy) -> Result<Self, PollError> {
        let activation = Activation::start(host, policy)?;
        let pump = Pump::for_activation(activation.clone());
        Ok(Self { activation, pump })
    }

    /// Let the host loop run `n` iterations.
    pub async fn poll(&self, n: usize) -> Result<(), PollError> {
        self.pump.pump(n).await
    }

    /// Start a worker that lets a synchronous caller drive the host loop.
    ///
    /// Only one poller may be live per scope.
    pub fn blocking(&self) -> Result<BlockingPoller, PollError> {
        BlockingPoller::spawn(self.activation.clone(), self.pump.clone())
    }

    /// The identity output is attributed to while polling.
    pub fn identity(&self) -> &TaskIdentity {
        self.activation.saved_identity()
    }

    pub fn host(&self) -> &SharedHost {
        self.activation.host()
    }

    pub fn host_id(&self) -> HostId {
        self.activation.host_id()
    }

    /// False once the scope was released or the host finished the task.
    pub fn is_active(&self) -> bool {
        self.activation.is_active()
    }

    /// Requests captured so far and not yet handed to replay.
    pub fn deferred(&self) -> usize {
        self.activation.deferred_len()
    }

    pub fn release(self) {
        self.activation.finish(FinishReason::Released);
    }

    pub(crate) fn finish(&self, reason: FinishReason) {
        self.activation.finish(reason);
    }
}

impl Drop for PollScope {
    fn drop(&mut self) {
        self.activation.finish(FinishReason::Dropped);
    }
}

impl std::fmt::Debug for PollScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScope")
            .field("host", &self.host_id())
            .field("active", &self.is_active())
            .field("deferred", &self.deferred())
            .finish()
    }
}
