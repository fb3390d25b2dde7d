use serde_json::json;
use ui_poll::host::{JournalEntry, SimulatedHost};
use ui_poll::{PendingRequest, TaskIdentity};

/// A request whose client identity is derived from its message id.
pub fn request(message_id: &str) -> PendingRequest {
    PendingRequest::new(
        "shell",
        format!("client-{message_id}"),
        json!({ "msg_id": message_id, "msg_type": "execute_request" }),
    )
}

pub fn cell_identity() -> TaskIdentity {
    TaskIdentity::new("cell-1", json!({ "msg_id": "cell-1" }))
}

/// A host whose current task is the running cell.
pub fn host_running_cell() -> std::sync::Arc<SimulatedHost> {
    use ui_poll::Host;

    let host = SimulatedHost::new();
    host.set_current_task_identity(cell_identity());
    host
}

pub fn count(host: &SimulatedHost, entry: &JournalEntry) -> usize {
    host.journal().iter().filter(|e| *e == entry).count()
}

pub fn position(host: &SimulatedHost, pred: impl Fn(&JournalEntry) -> bool) -> Option<usize> {
    host.journal().iter().position(pred)
}
