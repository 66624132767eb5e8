//! Boundaries between join gating and the host it runs inside.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};

use crate::error::JoinGateError;
use crate::policy::{PolicyConfig, PolicySource};
use crate::probe::CapabilityProbe;

/// Open/closed flag of the current session room.
///
/// "No active room" is a normal state and is signalled with
/// `JoinGateError::RoomUnavailable`.
pub trait RoomVisibility {
    fn is_open(&self) -> Result<bool, JoinGateError>;
    fn set_open(&self, open: bool) -> Result<(), JoinGateError>;
}

/// Who we are in the session.
pub trait RoleQuery {
    fn is_host(&self) -> bool;
}

/// Sibling subsystem that tracks per-scene state and must forget it when a
/// new level starts loading.
pub trait SceneResetHook {
    fn name(&self) -> &str;
    fn reset_scene(&self);
}

/// Every port the gating components talk through.
#[derive(Clone)]
pub struct HostPorts {
    pub room: Rc<dyn RoomVisibility>,
    pub directory: Rc<CapabilityProbe>,
    pub policy: Rc<dyn PolicySource>,
    pub role: Rc<dyn RoleQuery>,
}

impl HostPorts {
    pub fn is_host(&self) -> bool {
        self.role.is_host()
    }

    pub(crate) fn policy(&self) -> Result<PolicyConfig, JoinGateError> {
        self.policy.policy()
    }

    /// Current room flag, `None` when there is no room.
    pub(crate) fn room_is_open(&self) -> Option<bool> {
        self.room.is_open().map_err(|err| err.report()).ok()
    }

    pub(crate) fn set_room_open(&self, open: bool) {
        match self.room.set_open(open) {
            Ok(()) => debug!(target = "join_gate::room", "room open={open}"),
            Err(err) => err.report(),
        }
    }

    pub(crate) fn unlock_directory(&self) {
        if let Err(err) = self.directory.unlock(true) {
            err.report();
        }
    }

    pub(crate) fn lock_directory(&self) {
        if let Err(err) = self.directory.lock() {
            err.report();
        }
    }

    /// Room open and session listed.
    pub(crate) fn open_for_joins(&self) {
        info!(target = "join_gate", "opening session to late joiners");
        self.set_room_open(true);
        self.unlock_directory();
    }

    /// Room closed and session unlisted.
    pub(crate) fn close_for_joins(&self) {
        info!(target = "join_gate", "closing session to joiners");
        self.set_room_open(false);
        self.lock_directory();
    }
}

impl fmt::Debug for HostPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostPorts")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}
