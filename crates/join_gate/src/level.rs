use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of level the session is in or heading to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Shop,
    TruckHub,
    Arena,
    LobbyMenu,
    StandardLevel,
    /// Menus, tutorials and anything else join gating does not manage.
    #[default]
    Unknown,
}

impl LevelKind {
    pub const ALL: [LevelKind; 6] = [
        LevelKind::Shop,
        LevelKind::TruckHub,
        LevelKind::Arena,
        LevelKind::LobbyMenu,
        LevelKind::StandardLevel,
        LevelKind::Unknown,
    ];

    /// Whether join gating governs visibility while this level is loaded.
    pub const fn is_managed(self) -> bool {
        !matches!(self, LevelKind::Unknown)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LevelKind::Shop => "shop",
            LevelKind::TruckHub => "truck_hub",
            LevelKind::Arena => "arena",
            LevelKind::LobbyMenu => "lobby_menu",
            LevelKind::StandardLevel => "standard_level",
            LevelKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is known about one level change.
///
/// Built when the transition begins (`current_level_kind` still `Unknown`)
/// and finalized with [`TransitionContext::resolved`] once the next level is
/// known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionContext {
    pub previous_level_kind: LevelKind,
    pub level_failed: bool,
    pub completed_level: bool,
    pub current_level_kind: LevelKind,
}

impl TransitionContext {
    pub fn leaving(previous: LevelKind) -> Self {
        Self {
            previous_level_kind: previous,
            ..Self::default()
        }
    }

    pub fn with_failure(mut self, failed: bool) -> Self {
        self.level_failed = failed;
        self
    }

    pub fn with_completion(mut self, completed: bool) -> Self {
        self.completed_level = completed;
        self
    }

    pub fn resolved(mut self, current: LevelKind) -> Self {
        self.current_level_kind = current;
        self
    }

    /// Gating logic is active unless the new level is one it does not manage.
    pub fn gating_active(&self) -> bool {
        self.current_level_kind.is_managed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unknown_is_unmanaged() {
        let unmanaged: Vec<_> = LevelKind::ALL
            .into_iter()
            .filter(|kind| !kind.is_managed())
            .collect();
        assert_eq!(unmanaged, vec![LevelKind::Unknown]);
    }

    #[test]
    fn context_builder_keeps_begin_fields() {
        let ctx = TransitionContext::leaving(LevelKind::StandardLevel)
            .with_failure(true)
            .with_completion(false)
            .resolved(LevelKind::Arena);

        assert_eq!(ctx.previous_level_kind, LevelKind::StandardLevel);
        assert!(ctx.level_failed);
        assert!(!ctx.completed_level);
        assert_eq!(ctx.current_level_kind, LevelKind::Arena);
        assert!(ctx.gating_active());
    }
}
