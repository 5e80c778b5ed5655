use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// IdleAction
// ---------------------------------------------------------------------------

/// Catalog of low-impact idle actions. Each variant is enabled or disabled
/// independently in config, keyed by its camelCase name (`"lookAround"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdleAction {
    // ---
    Jump,
    Sneak,
    LookAround,
    SwingArm,
    WalkRandomly,
    SprintForward,
    ToggleWalk,
    MineBlockRandomly,
    PlaceBlockRandomly,
    UseItem,
    SwitchHotbar,
    DropItem,
    InteractWithEntity,
    OpenContainer,
}

// ---

impl IdleAction {
    // ---
    pub const ALL: [IdleAction; 14] = [
        IdleAction::Jump,
        IdleAction::Sneak,
        IdleAction::LookAround,
        IdleAction::SwingArm,
        IdleAction::WalkRandomly,
        IdleAction::SprintForward,
        IdleAction::ToggleWalk,
        IdleAction::MineBlockRandomly,
        IdleAction::PlaceBlockRandomly,
        IdleAction::UseItem,
        IdleAction::SwitchHotbar,
        IdleAction::DropItem,
        IdleAction::InteractWithEntity,
        IdleAction::OpenContainer,
    ];

    /// Config key, e.g. `"mineBlockRandomly"`.
    pub fn key(self) -> &'static str {
        // ---
        match self {
            Self::Jump => "jump",
            Self::Sneak => "sneak",
            Self::LookAround => "lookAround",
            Self::SwingArm => "swingArm",
            Self::WalkRandomly => "walkRandomly",
            Self::SprintForward => "sprintForward",
            Self::ToggleWalk => "toggleWalk",
            Self::MineBlockRandomly => "mineBlockRandomly",
            Self::PlaceBlockRandomly => "placeBlockRandomly",
            Self::UseItem => "useItem",
            Self::SwitchHotbar => "switchHotbar",
            Self::DropItem => "dropItem",
            Self::InteractWithEntity => "interactWithEntity",
            Self::OpenContainer => "openContainer",
        }
    }
}

impl fmt::Display for IdleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// ActionOutcome
// ---------------------------------------------------------------------------

/// Result of one action that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    // ---
    Performed,

    /// No eligible target (block, item, entity). A normal outcome.
    Skipped(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
