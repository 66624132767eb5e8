//! In-memory stand-ins for the session room, lobby directory and player list.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use join_gate::{
    DirectoryCallError, DirectoryHost, DirectoryService, JoinGateError, RoleQuery,
    RoomVisibility, SceneResetHook, UnlockShape,
};
use tracing::info;

/// Session room. `None` while no room exists.
#[derive(Debug)]
pub struct SimRoom {
    open: Cell<Option<bool>>,
}

impl SimRoom {
    pub fn new(open: bool) -> Self {
        Self {
            open: Cell::new(Some(open)),
        }
    }

    pub fn state(&self) -> Option<bool> {
        self.open.get()
    }

    pub fn drop_room(&self) {
        info!(target = "join_gate_host::sim", "room dropped");
        self.open.set(None);
    }

    /// Recreate the room; a new room starts closed.
    pub fn restore(&self) {
        if self.open.get().is_none() {
            info!(target = "join_gate_host::sim", "room restored");
            self.open.set(Some(false));
        }
    }
}

impl RoomVisibility for SimRoom {
    fn is_open(&self) -> Result<bool, JoinGateError> {
        self.open.get().ok_or(JoinGateError::RoomUnavailable)
    }

    fn set_open(&self, open: bool) -> Result<(), JoinGateError> {
        if self.open.get().is_none() {
            return Err(JoinGateError::RoomUnavailable);
        }
        self.open.set(Some(open));
        Ok(())
    }
}

/// Lobby directory service of one particular host build.
#[derive(Debug)]
pub struct SimService {
    shape: Option<UnlockShape>,
    listed: Cell<bool>,
    public: Cell<bool>,
}

impl SimService {
    fn list(&self, public: bool) {
        self.listed.set(true);
        self.public.set(public);
    }

    fn require(&self, shape: UnlockShape) -> Result<(), DirectoryCallError> {
        if self.shape == Some(shape) {
            Ok(())
        } else {
            Err(DirectoryCallError::NotExposed)
        }
    }
}

impl DirectoryService for SimService {
    fn unlock(&self) -> Result<(), DirectoryCallError> {
        self.require(UnlockShape::NoArg)?;
        self.list(true);
        Ok(())
    }

    fn unlock_public(&self, open_to_public: bool) -> Result<(), DirectoryCallError> {
        self.require(UnlockShape::BoolArg)?;
        self.list(open_to_public);
        Ok(())
    }

    fn lock(&self) -> Result<(), DirectoryCallError> {
        self.listed.set(false);
        Ok(())
    }
}

pub struct SimDirectory {
    service: Rc<SimService>,
    present: Cell<bool>,
}

impl SimDirectory {
    pub fn new(shape: Option<UnlockShape>) -> Self {
        Self {
            service: Rc::new(SimService {
                shape,
                listed: Cell::new(false),
                public: Cell::new(false),
            }),
            present: Cell::new(true),
        }
    }

    pub fn is_listed(&self) -> bool {
        self.service.listed.get()
    }

    pub fn is_public(&self) -> bool {
        self.service.public.get()
    }

    pub fn set_present(&self, present: bool) {
        info!(
            target = "join_gate_host::sim",
            "lobby directory {}",
            if present { "back" } else { "gone" }
        );
        self.present.set(present);
    }
}

impl DirectoryHost for SimDirectory {
    fn exposes(&self, shape: UnlockShape) -> bool {
        self.service.shape == Some(shape)
    }

    fn service(&self) -> Option<Rc<dyn DirectoryService>> {
        self.present
            .get()
            .then(|| self.service.clone() as Rc<dyn DirectoryService>)
    }
}

impl fmt::Debug for SimDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimDirectory")
            .field("shape", &self.service.shape)
            .field("present", &self.present.get())
            .field("listed", &self.is_listed())
            .finish()
    }
}

#[derive(Debug)]
pub struct SimRole {
    host: bool,
}

impl SimRole {
    pub fn new(host: bool) -> Self {
        Self { host }
    }
}

impl RoleQuery for SimRole {
    fn is_host(&self) -> bool {
        self.host
    }
}

/// Per-scene bookkeeping of players that joined the current level.
#[derive(Debug, Default)]
pub struct PlayerTracker {
    joined: RefCell<Vec<String>>,
    resets: Cell<u32>,
}

impl PlayerTracker {
    pub fn record_join(&self, player: impl Into<String>) {
        self.joined.borrow_mut().push(player.into());
    }

    pub fn joined(&self) -> usize {
        self.joined.borrow().len()
    }

    pub fn resets(&self) -> u32 {
        self.resets.get()
    }
}

impl SceneResetHook for PlayerTracker {
    fn name(&self) -> &str {
        "player tracker"
    }

    fn reset_scene(&self) {
        self.joined.borrow_mut().clear();
        self.resets.set(self.resets.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_room_rejects_writes() {
        let room = SimRoom::new(true);
        room.drop_room();
        assert_eq!(room.set_open(true), Err(JoinGateError::RoomUnavailable));
        room.restore();
        assert_eq!(room.is_open(), Ok(false));
    }

    #[test]
    fn directory_exposes_only_its_shape() {
        let directory = SimDirectory::new(Some(UnlockShape::BoolArg));
        assert!(directory.exposes(UnlockShape::BoolArg));
        assert!(!directory.exposes(UnlockShape::NoArg));

        let service = directory.service().unwrap();
        assert_eq!(service.unlock(), Err(DirectoryCallError::NotExposed));
        service.unlock_public(false).unwrap();
        assert!(directory.is_listed());
        assert!(!directory.is_public());

        directory.set_present(false);
        assert!(directory.service().is_none());
    }

    #[test]
    fn tracker_forgets_on_reset() {
        let tracker = PlayerTracker::default();
        tracker.record_join("alice");
        tracker.reset_scene();
        assert_eq!(tracker.joined(), 0);
        assert_eq!(tracker.resets(), 1);
    }
}
