//! Join-gating state machine.
//!
//! One cycle per level transition:
//!
//! ```text
//! Idle -> AwaitingDecision -> DecisionClosed      -> Resolved -> Idle
//!                          \-> DecisionOpenPending -/
//! ```
//!
//! - `on_transition_begin` closes the room and snapshots the policy.
//! - `on_transition_resolved` decides, keeps everything closed while the level
//!   generates, and arms the failsafe if the decision is "open".
//! - `on_level_ready` applies the decision and disarms the failsafe.
//!
//! Levels that gating does not manage open immediately at resolution and skip
//! the rest of the cycle.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::early_lock::EarlyLockTrigger;
use crate::failsafe::{FailsafeHandle, FailsafeTimer};
use crate::level::TransitionContext;
use crate::lifecycle::LevelLifecycleEvents;
use crate::policy::{should_allow_join, GateDecision, GateTiming, PolicyConfig};
use crate::ports::{HostPorts, SceneResetHook};
use crate::probe::CapabilityProbe;
use crate::scheduler::Scheduler;

/// Where the coordinator is within the current transition cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatePhase {
    #[default]
    Idle,
    AwaitingDecision,
    DecisionClosed,
    DecisionOpenPending,
    Resolved,
}

pub struct JoinGateCoordinator {
    ports: HostPorts,
    failsafe: FailsafeTimer,
    failsafe_delay: Duration,
    failsafe_handle: Option<FailsafeHandle>,
    scene_hooks: Vec<Rc<dyn SceneResetHook>>,
    early_lock: Rc<Cell<bool>>,
    phase: GatePhase,
    decision: GateDecision,
    context: Option<TransitionContext>,
    policy: Option<PolicyConfig>,
    /// Set once normal resolution has run for the current cycle; read by the
    /// failsafe when it fires.
    resolved: Rc<Cell<bool>>,
}

impl JoinGateCoordinator {
    pub fn new(ports: HostPorts, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            ports,
            failsafe: FailsafeTimer::new(scheduler),
            failsafe_delay: GateTiming::DEFAULT_FAILSAFE_DELAY,
            failsafe_handle: None,
            scene_hooks: Vec::new(),
            early_lock: Rc::new(Cell::new(false)),
            phase: GatePhase::Idle,
            decision: GateDecision::Closed,
            context: None,
            policy: None,
            resolved: Rc::new(Cell::new(false)),
        }
    }

    pub fn with_failsafe_delay(mut self, delay: Duration) -> Self {
        self.failsafe_delay = delay;
        self
    }

    pub fn with_scene_hook(mut self, hook: Rc<dyn SceneResetHook>) -> Self {
        self.scene_hooks.push(hook);
        self
    }

    /// Trigger for the UI-side "level change imminent" signal.
    pub fn early_lock_trigger(&self) -> EarlyLockTrigger {
        EarlyLockTrigger::new(self.ports.clone(), self.early_lock.clone())
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    /// Decision of the current (or most recent) cycle.
    pub fn decision(&self) -> GateDecision {
        self.decision
    }

    /// Context of the current (or most recent) cycle.
    pub fn context(&self) -> Option<&TransitionContext> {
        self.context.as_ref()
    }

    pub fn failsafe_armed(&self) -> bool {
        self.failsafe.is_armed()
    }

    pub fn failsafe_delay(&self) -> Duration {
        self.failsafe_delay
    }

    pub fn probe(&self) -> &CapabilityProbe {
        &self.ports.directory
    }

    fn enter(&mut self, next: GatePhase) {
        debug!(
            target = "join_gate::coordinator",
            "phase {:?} -> {next:?}",
            self.phase
        );
        self.phase = next;
    }

    fn disarm_failsafe(&mut self) {
        match self.failsafe_handle.take() {
            Some(handle) => {
                self.failsafe.disarm(handle);
            }
            None => {
                self.failsafe.disarm_current();
            }
        }
    }

    fn arm_failsafe(&mut self) {
        let resolved = self.resolved.clone();
        let ports = self.ports.clone();
        let early_lock = self.early_lock.clone();
        let handle = self.failsafe.arm(
            self.failsafe_delay,
            move || resolved.get(),
            move || {
                ports.open_for_joins();
                early_lock.set(false);
            },
        );
        self.failsafe_handle = Some(handle);
    }

    pub fn on_transition_begin(&mut self, ctx: TransitionContext) {
        if !self.ports.is_host() {
            debug!(
                target = "join_gate::coordinator",
                "not hosting, ignoring transition begin"
            );
            return;
        }
        if self.phase != GatePhase::Idle {
            debug!(
                target = "join_gate::coordinator",
                "transition begins while {:?}, abandoning previous cycle",
                self.phase
            );
        }

        // A failsafe left over from the previous level must not reopen the
        // room while the next one generates.
        self.disarm_failsafe();

        for hook in &self.scene_hooks {
            debug!(
                target = "join_gate::coordinator",
                "resetting scene state of {}",
                hook.name()
            );
            hook.reset_scene();
        }

        self.ports.set_room_open(false);
        self.decision = GateDecision::Closed;
        self.context = Some(ctx);
        self.resolved.set(false);

        self.policy = match self.ports.policy() {
            Ok(policy) => Some(policy),
            Err(err) => {
                err.report();
                warn!(
                    target = "join_gate::coordinator",
                    "denying joins until the next transition"
                );
                self.ports.close_for_joins();
                None
            }
        };

        info!(
            target = "join_gate::coordinator",
            "leaving {} (failed={}, completed={})",
            ctx.previous_level_kind,
            ctx.level_failed,
            ctx.completed_level
        );
        self.enter(GatePhase::AwaitingDecision);
    }

    pub fn on_transition_resolved(&mut self, ctx: TransitionContext) {
        if !self.ports.is_host() {
            debug!(
                target = "join_gate::coordinator",
                "not hosting, ignoring transition resolution"
            );
            return;
        }

        match self.phase {
            GatePhase::AwaitingDecision => {}
            GatePhase::Idle | GatePhase::Resolved => {
                warn!(
                    target = "join_gate::coordinator",
                    "transition resolved without a begin, reading policy now"
                );
                self.resolved.set(false);
                self.policy = self.ports.policy().map_err(|err| err.report()).ok();
            }
            GatePhase::DecisionClosed | GatePhase::DecisionOpenPending => {
                warn!(
                    target = "join_gate::coordinator",
                    "transition resolved twice in one cycle, deciding again"
                );
            }
        }
        self.context = Some(ctx);
        let level = ctx.current_level_kind;

        let Some(policy) = self.policy else {
            warn!(
                target = "join_gate::coordinator",
                "no join policy bound, keeping {level} closed"
            );
            self.decision = GateDecision::Closed;
            self.disarm_failsafe();
            self.ports.close_for_joins();
            self.enter(GatePhase::DecisionClosed);
            return;
        };

        if !ctx.gating_active() {
            info!(
                target = "join_gate::coordinator",
                "{level} is not gated, opening immediately"
            );
            self.decision = GateDecision::Open;
            self.ports.open_for_joins();
            self.disarm_failsafe();
            self.resolved.set(true);
            self.early_lock.set(false);
            self.enter(GatePhase::Resolved);
            self.enter(GatePhase::Idle);
            return;
        }

        self.decision = should_allow_join(&ctx, &policy).into();
        info!(
            target = "join_gate::coordinator",
            "joins into {level} will be {:?} once it is ready",
            self.decision
        );

        // Closed while the level generates, whatever the decision.
        self.ports.close_for_joins();
        self.resolved.set(false);

        if self.decision.is_open() {
            self.arm_failsafe();
            self.enter(GatePhase::DecisionOpenPending);
        } else {
            self.disarm_failsafe();
            self.enter(GatePhase::DecisionClosed);
        }
    }

    pub fn on_level_ready(&mut self) {
        if !self.ports.is_host() {
            debug!(
                target = "join_gate::coordinator",
                "not hosting, ignoring level ready"
            );
            return;
        }

        match self.phase {
            GatePhase::Idle | GatePhase::Resolved => {
                debug!(
                    target = "join_gate::coordinator",
                    "level ready with nothing pending"
                );
                return;
            }
            GatePhase::AwaitingDecision => {
                warn!(
                    target = "join_gate::coordinator",
                    "level ready before the transition resolved, applying {:?}",
                    self.decision
                );
            }
            GatePhase::DecisionClosed | GatePhase::DecisionOpenPending => {}
        }

        match self.decision {
            GateDecision::Open => {
                info!(target = "join_gate::coordinator", "level ready, opening");
                self.ports.set_room_open(true);
                self.ports.unlock_directory();
            }
            GateDecision::Closed => {
                if self.ports.room_is_open() == Some(true) {
                    warn!(
                        target = "join_gate::coordinator",
                        "room found open on a closed decision, closing it"
                    );
                    self.ports.set_room_open(false);
                }
                self.ports.lock_directory();
            }
        }

        self.resolved.set(true);
        self.disarm_failsafe();
        self.early_lock.set(false);
        self.enter(GatePhase::Resolved);
        self.policy = None;
        self.enter(GatePhase::Idle);
    }
}

impl LevelLifecycleEvents for JoinGateCoordinator {
    fn on_transition_begin(&mut self, ctx: TransitionContext) {
        JoinGateCoordinator::on_transition_begin(self, ctx);
    }

    fn on_transition_resolved(&mut self, ctx: TransitionContext) {
        JoinGateCoordinator::on_transition_resolved(self, ctx);
    }

    fn on_level_ready(&mut self) {
        JoinGateCoordinator::on_level_ready(self);
    }
}

impl std::fmt::Debug for JoinGateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinGateCoordinator")
            .field("phase", &self.phase)
            .field("decision", &self.decision)
            .field("context", &self.context)
            .field("failsafe", &self.failsafe)
            .field("failsafe_delay", &self.failsafe_delay)
            .finish_non_exhaustive()
    }
}
