//! Scripted host timelines.
//!
//! A scenario is a TOML file with one `[[step]]` table per action:
//!
//! ```toml
//! [[step]]
//! action = "begin"
//! from = "truck_hub"
//!
//! [[step]]
//! action = "resolve"
//! to = "standard_level"
//!
//! [[step]]
//! action = "wait"
//! secs = 12.0
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use color_eyre::eyre::{bail, Result, WrapErr};
use join_gate::LevelKind;
use serde::Deserialize;

/// Ship leaves, level never reports ready, the failsafe reopens the room.
/// Then a failed run into the truck hub stays locked.
const BUILTIN: &str = r#"
[[step]]
action = "signal"
reason = "ship leaving orbit"

[[step]]
action = "begin"
from = "truck_hub"

[[step]]
action = "resolve"
to = "standard_level"

[[step]]
action = "wait"
secs = 12.0

[[step]]
action = "join"
player = "late_friend"

[[step]]
action = "signal"
reason = "crew wiped"

[[step]]
action = "begin"
from = "standard_level"
failed = true

[[step]]
action = "resolve"
to = "truck_hub"

[[step]]
action = "join"
player = "mid_load_joiner"

[[step]]
action = "ready"
"#;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Begin {
        from: LevelKind,
        #[serde(default)]
        failed: bool,
        #[serde(default)]
        completed: bool,
    },
    Resolve {
        to: LevelKind,
    },
    Ready,
    /// A player tries to join the session.
    Join {
        player: String,
    },
    Signal {
        #[serde(default = "default_reason")]
        reason: String,
    },
    Wait {
        secs: f64,
    },
    DropRoom,
    RestoreRoom,
    DropDirectory,
    RestoreDirectory,
}

fn default_reason() -> String {
    "scripted".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(rename = "step", default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN).wrap_err("built-in scenario")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&content).wrap_err_with(|| format!("scenario {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        if scenario.steps.is_empty() {
            bail!("scenario has no steps");
        }
        for (index, step) in scenario.steps.iter().enumerate() {
            if let Step::Wait { secs } = step {
                if let Err(err) = Duration::try_from_secs_f64(*secs) {
                    bail!("step {}: wait of {secs}s is not a valid duration: {err}", index + 1);
                }
            }
        }
        Ok(scenario)
    }
}

impl Step {
    pub fn wait_duration(&self) -> Option<Duration> {
        match self {
            Step::Wait { secs } => Duration::try_from_secs_f64(*secs).ok(),
            _ => None,
        }
    }
}
