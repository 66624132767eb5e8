#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use join_gate::{
    CapabilityProbe, DirectoryCallError, DirectoryHost, DirectoryService, HostPorts,
    JoinGateCoordinator, JoinGateError, LevelKind, ManualScheduler, PolicyConfig, PolicySource,
    RoleQuery, RoomVisibility, SceneResetHook, TransitionContext, UnlockShape,
};

pub const FAILSAFE: Duration = Duration::from_secs(10);

/// Session room; `None` means there is no active room.
#[derive(Default)]
pub struct FakeRoom {
    pub open: Cell<Option<bool>>,
    pub writes: RefCell<Vec<bool>>,
}

impl FakeRoom {
    pub fn with_state(open: bool) -> Self {
        let room = Self::default();
        room.open.set(Some(open));
        room
    }

    pub fn is_open_now(&self) -> bool {
        self.open.get() == Some(true)
    }
}

impl RoomVisibility for FakeRoom {
    fn is_open(&self) -> Result<bool, JoinGateError> {
        self.open.get().ok_or(JoinGateError::RoomUnavailable)
    }

    fn set_open(&self, open: bool) -> Result<(), JoinGateError> {
        let Some(_) = self.open.get() else {
            return Err(JoinGateError::RoomUnavailable);
        };
        self.open.set(Some(open));
        self.writes.borrow_mut().push(open);
        Ok(())
    }
}

/// Directory service that exposes exactly one unlock shape.
pub struct FakeService {
    pub shape: UnlockShape,
    pub calls: RefCell<Vec<String>>,
    pub listed: Cell<bool>,
    pub reject_unlock: Cell<bool>,
}

impl DirectoryService for FakeService {
    fn unlock(&self) -> Result<(), DirectoryCallError> {
        if self.shape != UnlockShape::NoArg {
            return Err(DirectoryCallError::NotExposed);
        }
        self.calls.borrow_mut().push("unlock".into());
        if self.reject_unlock.get() {
            return Err(DirectoryCallError::Rejected("lobby full".into()));
        }
        self.listed.set(true);
        Ok(())
    }

    fn unlock_public(&self, open_to_public: bool) -> Result<(), DirectoryCallError> {
        if self.shape != UnlockShape::BoolArg {
            return Err(DirectoryCallError::NotExposed);
        }
        self.calls
            .borrow_mut()
            .push(format!("unlock_public({open_to_public})"));
        if self.reject_unlock.get() {
            return Err(DirectoryCallError::Rejected("lobby full".into()));
        }
        self.listed.set(true);
        Ok(())
    }

    fn lock(&self) -> Result<(), DirectoryCallError> {
        self.calls.borrow_mut().push("lock".into());
        self.listed.set(false);
        Ok(())
    }
}

pub struct FakeDirectory {
    /// Shapes this build exposes; empty means neither.
    pub exposed: Vec<UnlockShape>,
    pub service: Rc<FakeService>,
    pub present: Cell<bool>,
    pub probes: Cell<u32>,
}

impl FakeDirectory {
    pub fn new(shape: UnlockShape) -> Self {
        Self {
            exposed: vec![shape],
            service: Rc::new(FakeService {
                shape,
                calls: RefCell::new(Vec::new()),
                listed: Cell::new(true),
                reject_unlock: Cell::new(false),
            }),
            present: Cell::new(true),
            probes: Cell::new(0),
        }
    }

    pub fn without_unlock() -> Self {
        let mut directory = Self::new(UnlockShape::NoArg);
        directory.exposed.clear();
        directory
    }

    pub fn calls(&self) -> Vec<String> {
        self.service.calls.borrow().clone()
    }

    pub fn is_listed(&self) -> bool {
        self.service.listed.get()
    }
}

impl DirectoryHost for FakeDirectory {
    fn exposes(&self, shape: UnlockShape) -> bool {
        self.probes.set(self.probes.get() + 1);
        self.exposed.contains(&shape)
    }

    fn service(&self) -> Option<Rc<dyn DirectoryService>> {
        if self.present.get() {
            Some(self.service.clone())
        } else {
            None
        }
    }
}

pub struct FakeRole(pub Cell<bool>);

impl RoleQuery for FakeRole {
    fn is_host(&self) -> bool {
        self.0.get()
    }
}

#[derive(Default)]
pub struct ResetCounter {
    pub resets: Cell<u32>,
}

impl SceneResetHook for ResetCounter {
    fn name(&self) -> &str {
        "player tracker"
    }

    fn reset_scene(&self) {
        self.resets.set(self.resets.get() + 1);
    }
}

pub fn policy() -> PolicyConfig {
    PolicyConfig {
        allow_in_shop: false,
        allow_in_truck: true,
        allow_in_arena: false,
        allow_in_level: true,
        lock_on_generation_failure: true,
    }
}

pub struct Harness {
    pub room: Rc<FakeRoom>,
    pub directory: Rc<FakeDirectory>,
    pub role: Rc<FakeRole>,
    pub hook: Rc<ResetCounter>,
    pub scheduler: ManualScheduler,
    pub gate: JoinGateCoordinator,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(Rc::new(Some(policy())), FakeDirectory::new(UnlockShape::NoArg))
    }

    pub fn with_policy(policy: Option<PolicyConfig>) -> Self {
        Self::build(Rc::new(policy), FakeDirectory::new(UnlockShape::NoArg))
    }

    pub fn with_directory(directory: FakeDirectory) -> Self {
        Self::build(Rc::new(Some(policy())), directory)
    }

    pub fn build(policy: Rc<dyn PolicySource>, directory: FakeDirectory) -> Self {
        let room = Rc::new(FakeRoom::with_state(true));
        let directory = Rc::new(directory);
        let role = Rc::new(FakeRole(Cell::new(true)));
        let hook = Rc::new(ResetCounter::default());
        let scheduler = ManualScheduler::new();

        let ports = HostPorts {
            room: room.clone(),
            directory: Rc::new(CapabilityProbe::new(directory.clone())),
            policy,
            role: role.clone(),
        };
        let gate = JoinGateCoordinator::new(ports, Rc::new(scheduler.clone()))
            .with_failsafe_delay(FAILSAFE)
            .with_scene_hook(hook.clone());

        Self {
            room,
            directory,
            role,
            hook,
            scheduler,
            gate,
        }
    }

    /// Begin and resolve a transition from `from` into `to`.
    pub fn enter(&mut self, from: LevelKind, to: LevelKind) -> TransitionContext {
        let ctx = TransitionContext::leaving(from);
        self.gate.on_transition_begin(ctx);
        let resolved = ctx.resolved(to);
        self.gate.on_transition_resolved(resolved);
        resolved
    }

    pub fn room_writes(&self) -> usize {
        self.room.writes.borrow().len()
    }
}
