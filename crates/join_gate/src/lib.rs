//! Host-side late-join gating across level transitions.
//!
//! While the host changes levels, nobody may join into a half-built level.
//! [`JoinGateCoordinator`] rides along with the host's level lifecycle
//! callbacks, keeps the session room closed and the lobby unlisted while a
//! level generates, and applies the configured decision once the level is
//! ready. A [`FailsafeTimer`] reopens the session if the ready callback never
//! arrives, and [`EarlyLockTrigger`] lets the UI lock ahead of the lifecycle.
//!
//! Everything here runs on the host's single update thread. Deferred work goes
//! through a [`Scheduler`]: [`TokioScheduler`] for a real `LocalSet`,
//! [`ManualScheduler`] for tests and simulations with a virtual clock.
//!
//! # Example
//! ```no_run
//! use std::rc::Rc;
//! use join_gate::{
//!     HostPorts, JoinGateCoordinator, LevelKind, TokioScheduler, TransitionContext,
//! };
//!
//! fn wire(ports: HostPorts) {
//!     let mut gate = JoinGateCoordinator::new(ports, Rc::new(TokioScheduler));
//!     let ctx = TransitionContext::leaving(LevelKind::TruckHub);
//!     gate.on_transition_begin(ctx);
//!     gate.on_transition_resolved(ctx.resolved(LevelKind::StandardLevel));
//!     gate.on_level_ready();
//! }
//! ```

mod coordinator;
mod early_lock;
mod error;
mod failsafe;
mod level;
mod lifecycle;
mod policy;
mod ports;
mod probe;
mod scheduler;

pub use coordinator::{GatePhase, JoinGateCoordinator};
pub use early_lock::EarlyLockTrigger;
pub use error::{DirectoryCallError, JoinGateError};
pub use failsafe::{FailsafeHandle, FailsafeTimer};
pub use level::{LevelKind, TransitionContext};
pub use lifecycle::{LevelLifecycleEvents, LifecycleEvent};
pub use policy::{should_allow_join, GateDecision, GateTiming, PolicyConfig, PolicySource};
pub use ports::{HostPorts, RoleQuery, RoomVisibility, SceneResetHook};
pub use probe::{ApiVariant, CapabilityProbe, DirectoryHost, DirectoryService, UnlockShape};
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, Task, TokioScheduler};
