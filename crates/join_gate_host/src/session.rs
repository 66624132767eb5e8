//! One simulated host session driving the join gate through a scenario.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use join_gate::{
    ApiVariant, CapabilityProbe, EarlyLockTrigger, GateDecision, GatePhase, HostPorts,
    JoinGateCoordinator, LevelKind, LevelLifecycleEvents, LifecycleEvent, ManualScheduler,
    PolicySource, Scheduler, TokioScheduler, TransitionContext, UnlockShape,
};
use tracing::{debug, info};

use crate::scenario::{Scenario, Step};
use crate::sim::{PlayerTracker, SimDirectory, SimRole, SimRoom};

/// Time source for `wait` steps.
#[derive(Debug, Clone)]
pub enum Clock {
    /// Virtual time; waits return immediately after running due tasks.
    Virtual(ManualScheduler),
    /// Wall clock on the current `LocalSet`.
    Tokio,
}

impl Clock {
    fn scheduler(&self) -> Rc<dyn Scheduler> {
        match self {
            Clock::Virtual(scheduler) => Rc::new(scheduler.clone()),
            Clock::Tokio => Rc::new(TokioScheduler),
        }
    }

    async fn wait(&self, duration: Duration) {
        match self {
            Clock::Virtual(scheduler) => {
                let ran = scheduler.advance(duration);
                debug!(
                    target = "join_gate_host::session",
                    "advanced {duration:?}, {ran} task(s) ran"
                );
            }
            Clock::Tokio => tokio::time::sleep(duration).await,
        }
    }
}

pub struct SessionConfig {
    pub policy: Rc<dyn PolicySource>,
    pub failsafe_delay: Duration,
    pub api: Option<UnlockShape>,
    pub host: bool,
    pub clock: Clock,
}

pub struct Session {
    room: Rc<SimRoom>,
    directory: Rc<SimDirectory>,
    players: Rc<PlayerTracker>,
    gate: JoinGateCoordinator,
    early_lock: EarlyLockTrigger,
    clock: Clock,
    pending: Option<TransitionContext>,
    rejected: u32,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let room = Rc::new(SimRoom::new(true));
        let directory = Rc::new(SimDirectory::new(config.api));
        let players = Rc::new(PlayerTracker::default());

        let ports = HostPorts {
            room: room.clone(),
            directory: Rc::new(CapabilityProbe::new(directory.clone())),
            policy: config.policy,
            role: Rc::new(SimRole::new(config.host)),
        };
        let gate = JoinGateCoordinator::new(ports, config.clock.scheduler())
            .with_failsafe_delay(config.failsafe_delay)
            .with_scene_hook(players.clone());
        let early_lock = gate.early_lock_trigger();

        Self {
            room,
            directory,
            players,
            gate,
            early_lock,
            clock: config.clock,
            pending: None,
            rejected: 0,
        }
    }

    pub async fn run(&mut self, scenario: &Scenario) {
        for (index, step) in scenario.steps.iter().enumerate() {
            debug!(
                target = "join_gate_host::session",
                "step {}: {step:?}",
                index + 1
            );
            self.step(step).await;
        }
    }

    pub async fn step(&mut self, step: &Step) {
        match step {
            Step::Begin {
                from,
                failed,
                completed,
            } => {
                let ctx = TransitionContext::leaving(*from)
                    .with_failure(*failed)
                    .with_completion(*completed);
                self.pending = Some(ctx);
                self.gate.handle(LifecycleEvent::TransitionBegin(ctx));
            }
            Step::Resolve { to } => {
                let ctx = self
                    .pending
                    .take()
                    .unwrap_or_else(|| TransitionContext::leaving(LevelKind::Unknown))
                    .resolved(*to);
                self.gate.handle(LifecycleEvent::TransitionResolved(ctx));
            }
            Step::Ready => self.gate.handle(LifecycleEvent::LevelReady),
            Step::Join { player } => self.try_join(player),
            Step::Signal { reason } => {
                self.early_lock.on_imminent_transition_signal(reason);
            }
            Step::Wait { .. } => {
                if let Some(duration) = step.wait_duration() {
                    self.clock.wait(duration).await;
                }
            }
            Step::DropRoom => self.room.drop_room(),
            Step::RestoreRoom => self.room.restore(),
            Step::DropDirectory => self.directory.set_present(false),
            Step::RestoreDirectory => self.directory.set_present(true),
        }
    }

    fn try_join(&mut self, player: &str) {
        if self.room.state() == Some(true) {
            info!(target = "join_gate_host::session", "{player} joined");
            self.players.record_join(player);
        } else {
            info!(
                target = "join_gate_host::session",
                "{player} turned away, session closed"
            );
            self.rejected += 1;
        }
    }

    pub fn report(&self) -> Report {
        Report {
            room: self.room.state(),
            listed: self.directory.is_listed(),
            public: self.directory.is_public(),
            variant: self.gate.probe().detect_variant(),
            phase: self.gate.phase(),
            decision: self.gate.decision(),
            failsafe_armed: self.gate.failsafe_armed(),
            joined: self.players.joined(),
            rejected: self.rejected,
            scene_resets: self.players.resets(),
        }
    }
}

/// Final state of a session after its scenario ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub room: Option<bool>,
    pub listed: bool,
    pub public: bool,
    pub variant: ApiVariant,
    pub phase: GatePhase,
    pub decision: GateDecision,
    pub failsafe_armed: bool,
    pub joined: usize,
    pub rejected: u32,
    pub scene_resets: u32,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let room = match self.room {
            Some(true) => "open",
            Some(false) => "closed",
            None => "none",
        };
        writeln!(f, "room:           {room}")?;
        writeln!(
            f,
            "lobby:          {}",
            match (self.listed, self.public) {
                (true, true) => "listed (public)",
                (true, false) => "listed (friends only)",
                (false, _) => "unlisted",
            }
        )?;
        writeln!(f, "directory api:  {:?}", self.variant)?;
        writeln!(f, "gate:           {:?} / {:?}", self.phase, self.decision)?;
        writeln!(f, "failsafe armed: {}", self.failsafe_armed)?;
        writeln!(f, "scene resets:   {}", self.scene_resets)?;
        write!(
            f,
            "joins:          {} accepted in current level, {} turned away",
            self.joined, self.rejected
        )
    }
}
