//! Deferred request replay.
//!
//! Once interception ends, the captured requests run through the host's
//! original handler in arrival order, each under its own task identity, as if
//! they had never been held back.

use serde::{Deserialize, Serialize};

use crate::host::{HostError, PendingRequest, RequestHandler, SharedHost};
use crate::poll::error::PollError;
use crate::poll::registry::OwnershipToken;

/// What replay does after meeting an aborted request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplayPolicy {
    /// Acknowledge the aborted request and keep going.
    #[default]
    SkipAborted,
    /// Acknowledge the aborted request and every request after it.
    HaltOnAbort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub dispatched: usize,
    pub aborted: usize,
}

pub struct Replay {
    host: SharedHost,
    handler: RequestHandler,
    policy: ReplayPolicy,
    claim: Option<OwnershipToken>,
}

impl Replay {
    pub fn new(host: SharedHost, handler: RequestHandler, policy: ReplayPolicy) -> Self {
        Self {
            host,
            handler,
            policy,
            claim: None,
        }
    }

    /// Keep the host claimed until this replay has run or been discarded.
    pub fn holding(mut self, claim: OwnershipToken) -> Self {
        self.claim = Some(claim);
        self
    }

    pub async fn run(&self, queue: Vec<PendingRequest>) -> Result<ReplayReport, PollError> {
        let mut report = ReplayReport::default();
        if queue.is_empty() {
            return Ok(report);
        }

        self.host.flush_output_streams();
        let mut halted = false;

        for request in queue {
            self.host.set_current_task_identity(request.task_identity());

            if halted || self.host.is_aborted(&request) {
                self.acknowledge_abort(&request, &mut report, &mut halted)
                    .await?;
                continue;
            }

            match self.handler.call(request.clone()).await {
                Ok(()) => report.dispatched += 1,
                Err(HostError::Aborted(_)) => {
                    self.acknowledge_abort(&request, &mut report, &mut halted)
                        .await?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            self.host.flush_output_streams();
            self.host.publish_idle_status();
        }

        Ok(report)
    }

    async fn acknowledge_abort(
        &self,
        request: &PendingRequest,
        report: &mut ReplayReport,
        halted: &mut bool,
    ) -> Result<(), PollError> {
        tracing::debug!(
            message_id = request.message_id().unwrap_or("<none>"),
            "Deferred request was aborted"
        );
        self.host.send_abort_reply(request).await?;
        report.aborted += 1;
        if self.policy == ReplayPolicy::HaltOnAbort {
            *halted = true;
        }
        Ok(())
    }

    /// Hand the replay of `queue` to the host loop without waiting for it.
    ///
    /// A held claim is released when the task finishes, or right away if the
    /// host refuses the task.
    pub fn schedule(self, queue: Vec<PendingRequest>) -> Result<(), HostError> {
        let host = self.host.clone();
        let host_id = host.id();
        let task = async move {
            match self.run(queue).await {
                Ok(report) => tracing::debug!(
                    host = %host_id,
                    dispatched = report.dispatched,
                    aborted = report.aborted,
                    "Deferred requests replayed"
                ),
                Err(e) => tracing::warn!(
                    host = %host_id,
                    error = %e,
                    "Replay of deferred requests stopped"
                ),
            }
        };
        host.schedule(Box::pin(task))
    }
}
