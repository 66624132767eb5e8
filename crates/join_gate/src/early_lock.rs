use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::ports::HostPorts;

/// Closes the session as soon as something outside the level lifecycle says a
/// level change is about to happen, so that nobody joins into a level that is
/// being torn down.
///
/// Obtained from [`JoinGateCoordinator::early_lock_trigger`]; the coordinator
/// releases the latch when it finishes a cycle or reopens the room.
///
/// [`JoinGateCoordinator::early_lock_trigger`]: crate::JoinGateCoordinator::early_lock_trigger
#[derive(Debug, Clone)]
pub struct EarlyLockTrigger {
    ports: HostPorts,
    engaged: Rc<Cell<bool>>,
}

impl EarlyLockTrigger {
    pub(crate) fn new(ports: HostPorts, engaged: Rc<Cell<bool>>) -> Self {
        Self { ports, engaged }
    }

    /// Lock ahead of the transition. Returns whether anything was done.
    pub fn on_imminent_transition_signal(&self, reason: &str) -> bool {
        if !self.ports.is_host() {
            return false;
        }
        if self.engaged.get() {
            debug!(
                target = "join_gate::early_lock",
                "already locked for the coming transition ({reason})"
            );
            return false;
        }

        info!(
            target = "join_gate::early_lock",
            "transition imminent ({reason}), locking early"
        );
        self.ports.close_for_joins();
        self.engaged.set(true);
        true
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.get()
    }
}
