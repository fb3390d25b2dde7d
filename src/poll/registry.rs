//! Process-wide record of which hosts currently have an active interceptor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::host::HostId;
use crate::poll::error::PollError;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Proof of ownership of a host's interception slot.
///
/// The claim lasts as long as the token. Dropping it clears the claim, so a
/// token moved into a replay task keeps the host claimed until that task is
/// done or discarded.
#[derive(Debug, PartialEq, Eq)]
pub struct OwnershipToken {
    host: HostId,
    serial: u64,
}

impl OwnershipToken {
    pub fn host(&self) -> HostId {
        self.host
    }
}

fn active_cell() -> &'static Mutex<HashMap<HostId, u64>> {
    static CELL: OnceLock<Mutex<HashMap<HostId, u64>>> = OnceLock::new();
    CELL.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn claim(host: HostId) -> Result<OwnershipToken, PollError> {
    let mut active = active_cell().lock();
    if active.contains_key(&host) {
        return Err(PollError::AlreadyActive(host));
    }
    let serial = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
    active.insert(host, serial);
    Ok(OwnershipToken { host, serial })
}

impl Drop for OwnershipToken {
    fn drop(&mut self) {
        let mut active = active_cell().lock();
        if active.get(&self.host) == Some(&self.serial) {
            active.remove(&self.host);
        } else {
            tracing::warn!(host = %self.host, "Releasing a claim that is no longer registered");
        }
    }
}

pub fn is_claimed(host: HostId) -> bool {
    active_cell().lock().contains_key(&host)
}
