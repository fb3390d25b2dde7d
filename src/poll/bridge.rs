//! Blocking access to the pump for callers outside any async runtime.
//!
//! The pump is async, and a synchronous caller occupies the thread that would
//! otherwise drive it. A [`BlockingPoller`] owns a worker thread with its own
//! current-thread runtime; each [`poll`](BlockingPoller::poll) hands `n` to the
//! worker and waits for it to finish, so only one side runs host code at a time.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};

use crate::poll::error::PollError;
use crate::poll::lifecycle::Activation;
use crate::poll::pump::Pump;

enum BridgeCommand {
    Pump {
        n: usize,
        reply: oneshot::Sender<Result<(), PollError>>,
    },
}

pub struct BlockingPoller {
    activation: Arc<Activation>,
    commands: Option<mpsc::Sender<BridgeCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl BlockingPoller {
    pub(crate) fn spawn(activation: Arc<Activation>, pump: Pump) -> Result<Self, PollError> {
        ensure_outside_runtime()?;
        activation.claim_bridge()?;

        match start_worker(pump) {
            Ok((commands, worker)) => {
                tracing::debug!(host = %activation.host_id(), "Blocking poller started");
                Ok(Self {
                    activation,
                    commands: Some(commands),
                    worker: Some(worker),
                })
            }
            Err(e) => {
                activation.release_bridge();
                Err(e)
            }
        }
    }

    /// Run `n` host loop iterations on the worker, blocking until they finish.
    pub fn poll(&self, n: usize) -> Result<(), PollError> {
        ensure_outside_runtime()?;
        let commands = self.commands.as_ref().ok_or(PollError::BridgeClosed)?;
        let (reply, done) = oneshot::channel();
        commands
            .blocking_send(BridgeCommand::Pump { n, reply })
            .map_err(|_| PollError::BridgeClosed)?;
        done.blocking_recv().map_err(|_| PollError::BridgeClosed)?
    }
}

impl Drop for BlockingPoller {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!(host = %self.activation.host_id(), "Blocking poller worker panicked");
            }
        }
        self.activation.release_bridge();
        tracing::debug!(host = %self.activation.host_id(), "Blocking poller stopped");
    }
}

impl std::fmt::Debug for BlockingPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingPoller")
            .field("host", &self.activation.host_id())
            .field("running", &self.worker.is_some())
            .finish()
    }
}

fn ensure_outside_runtime() -> Result<(), PollError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(PollError::InsideRuntime);
    }
    Ok(())
}

fn start_worker(pump: Pump) -> Result<(mpsc::Sender<BridgeCommand>, JoinHandle<()>), PollError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PollError::Bridge(e.to_string()))?;

    let (commands, mut rx) = mpsc::channel::<BridgeCommand>(1);
    let worker = std::thread::Builder::new()
        .name("ui-poll-bridge".into())
        .spawn(move || {
            runtime.block_on(async move {
                while let Some(command) = rx.recv().await {
                    match command {
                        BridgeCommand::Pump { n, reply } => {
                            let result = pump.pump(n).await;
                            // The caller may have given up waiting.
                            let _ = reply.send(result);
                        }
                    }
                }
            });
        })
        .map_err(|e| PollError::Bridge(e.to_string()))?;

    Ok((commands, worker))
}
