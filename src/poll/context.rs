use crate::host::{SharedHost, TaskIdentity};

/// Puts the host's task identity back to a saved value.
#[derive(Clone)]
pub struct ContextGuard {
    host: SharedHost,
    saved: TaskIdentity,
}

impl ContextGuard {
    pub fn new(host: SharedHost, saved: TaskIdentity) -> Self {
        Self { host, saved }
    }

    pub fn restore(&self) {
        self.host.set_current_task_identity(self.saved.clone());
    }

    pub fn saved(&self) -> &TaskIdentity {
        &self.saved
    }
}
