//! Roles, the night action each role owns, and the two sides.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A player's secret role, dealt once when the game starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Mafia,
    Detective,
    Doctor,
    Villager,
}

impl Role {
    /// The only night action this role may submit.
    ///
    /// This is the whole role/action table: every night submission is
    /// checked against it.
    pub fn night_action(self) -> NightActionKind {
        match self {
            Self::Mafia => NightActionKind::Kill,
            Self::Detective => NightActionKind::Investigate,
            Self::Doctor => NightActionKind::Heal,
            Self::Villager => NightActionKind::Wait,
        }
    }

    /// Which side wins alongside this role.
    pub fn side(self) -> Side {
        match self {
            Self::Mafia => Side::Mafia,
            Self::Detective | Self::Doctor | Self::Villager => Side::Villagers,
        }
    }

    pub fn is_mafia(self) -> bool {
        matches!(self, Self::Mafia)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mafia => write!(f, "mafia"),
            Self::Detective => write!(f, "detective"),
            Self::Doctor => write!(f, "doctor"),
            Self::Villager => write!(f, "villager"),
        }
    }
}

/// What a player does at night.
///
/// `Wait` is the villager's placebo: it may carry a target so that villagers
/// look like everyone else on the table, but it changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightActionKind {
    Kill,
    Investigate,
    Heal,
    Wait,
}

impl NightActionKind {
    /// Whether this action needs a living target to mean anything.
    pub fn requires_target(self) -> bool {
        !matches!(self, Self::Wait)
    }
}

impl fmt::Display for NightActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kill => write!(f, "kill"),
            Self::Investigate => write!(f, "investigate"),
            Self::Heal => write!(f, "heal"),
            Self::Wait => write!(f, "wait"),
        }
    }
}

/// The two teams a game can end in favour of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Mafia,
    Villagers,
}

impl Side {
    /// The line announced to the room when this side wins.
    pub fn victory_message(self) -> &'static str {
        match self {
            Self::Mafia => "Mafia outnumbers the villagers!",
            Self::Villagers => "All mafia have been eliminated!",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mafia => write!(f, "mafia"),
            Self::Villagers => write!(f, "villagers"),
        }
    }
}
