//! Join policy: which levels may accept late joiners.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use settings::{Settings, SettingsError, SettingsStore};

use crate::error::JoinGateError;
use crate::level::{LevelKind, TransitionContext};

/// Host-configured join rules, the `[join_policy]` section.
///
/// Every flag is required. A file without the section, or with only some of
/// the flags, leaves the policy unbound and the coordinator denies joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub allow_in_shop: bool,
    pub allow_in_truck: bool,
    pub allow_in_arena: bool,
    pub allow_in_level: bool,
    pub lock_on_generation_failure: bool,
}

impl Settings for PolicyConfig {
    const SECTION: &'static str = "join_policy";
}

/// Failsafe timing, the `[join_timing]` section. Optional; defaults apply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateTiming {
    pub failsafe_delay_secs: f64,
}

impl GateTiming {
    pub const DEFAULT_FAILSAFE_DELAY: Duration = Duration::from_secs(10);

    /// The delay as a `Duration`; `Invalid` for values no `Duration` can hold.
    pub fn failsafe_delay(&self) -> Result<Duration, SettingsError> {
        Duration::try_from_secs_f64(self.failsafe_delay_secs).map_err(|err| {
            SettingsError::Invalid {
                section: Self::SECTION,
                reason: format!(
                    "failsafe_delay_secs = {} is not a usable delay: {err}",
                    self.failsafe_delay_secs
                ),
            }
        })
    }
}

impl Default for GateTiming {
    fn default() -> Self {
        Self {
            failsafe_delay_secs: Self::DEFAULT_FAILSAFE_DELAY.as_secs_f64(),
        }
    }
}

impl Settings for GateTiming {
    const SECTION: &'static str = "join_timing";

    fn validate(&self) -> Result<(), SettingsError> {
        self.failsafe_delay().map(|_| ())
    }
}

/// Whether the room should accept joins once the next level is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateDecision {
    #[default]
    Closed,
    Open,
}

impl GateDecision {
    pub const fn is_open(self) -> bool {
        matches!(self, GateDecision::Open)
    }
}

impl From<bool> for GateDecision {
    fn from(allow: bool) -> Self {
        if allow {
            GateDecision::Open
        } else {
            GateDecision::Closed
        }
    }
}

impl From<GateDecision> for bool {
    fn from(decision: GateDecision) -> Self {
        decision.is_open()
    }
}

/// Evaluate the join rules for a finalized transition. First match wins.
pub fn should_allow_join(ctx: &TransitionContext, policy: &PolicyConfig) -> bool {
    let current = ctx.current_level_kind;

    if ctx.level_failed {
        if current == LevelKind::Arena {
            return policy.allow_in_arena;
        }
        if policy.lock_on_generation_failure {
            return false;
        }
    }

    match current {
        LevelKind::Shop if policy.allow_in_shop => true,
        LevelKind::TruckHub if policy.allow_in_truck => true,
        LevelKind::Arena if policy.allow_in_arena => true,
        LevelKind::LobbyMenu => true,
        LevelKind::StandardLevel if policy.allow_in_level => true,
        _ => false,
    }
}

/// Read-only source of the join policy.
pub trait PolicySource {
    /// The bound policy, or `ConfigurationMissing` if any part of it is absent.
    fn policy(&self) -> Result<PolicyConfig, JoinGateError>;
}

impl PolicySource for PolicyConfig {
    fn policy(&self) -> Result<PolicyConfig, JoinGateError> {
        Ok(*self)
    }
}

impl PolicySource for Option<PolicyConfig> {
    fn policy(&self) -> Result<PolicyConfig, JoinGateError> {
        self.ok_or_else(|| JoinGateError::ConfigurationMissing("no policy bound".into()))
    }
}

impl PolicySource for SettingsStore {
    fn policy(&self) -> Result<PolicyConfig, JoinGateError> {
        self.get::<PolicyConfig>()
            .map_err(|err| JoinGateError::ConfigurationMissing(err.to_string()))
    }
}
