use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies one host instance within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(pub u64);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host-{}", self.0)
    }
}

/// Handle returned by `Host::on_task_completed`, used to unregister the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub u64);

/// "Whose output is this": the ambient task marker the host attributes output to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskIdentity {
    pub identity: String,
    pub header: Value,
}

impl TaskIdentity {
    pub fn new(identity: impl Into<String>, header: Value) -> Self {
        Self {
            identity: identity.into(),
            header,
        }
    }
}

/// A unit of foreground work captured verbatim while interception is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub channel: String,
    pub identity: String,
    pub header: Value,
}

impl PendingRequest {
    pub fn new(channel: impl Into<String>, identity: impl Into<String>, header: Value) -> Self {
        Self {
            channel: channel.into(),
            identity: identity.into(),
            header,
        }
    }

    /// The `msg_id` field of the header, if the request carries one.
    pub fn message_id(&self) -> Option<&str> {
        self.header.get("msg_id").and_then(Value::as_str)
    }

    /// Identity the host should attribute this request's output to.
    pub fn task_identity(&self) -> TaskIdentity {
        TaskIdentity::new(self.identity.clone(), self.header.clone())
    }
}
