//! The phase state machine of a game.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a game is in its cycle.
///
/// ```text
/// Lobby → Night → Day → Voting ─┐
///           ↑                   │
///           └───────────────────┘
///  (any active phase) → GameOver
/// ```
///
/// - **Lobby**: accepting players; nothing is secret yet.
/// - **Night**: roles act in secret; resolves when every required role has
///   acted.
/// - **Day**: open discussion; ends when every living player is ready.
/// - **Voting**: each living player casts one ballot.
/// - **GameOver**: a side has won. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    Night,
    Day,
    Voting,
    GameOver,
}

impl Phase {
    /// Returns `true` between the start of the game and its end.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Night | Self::Day | Self::Voting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::Night => write!(f, "night"),
            Self::Day => write!(f, "day"),
            Self::Voting => write!(f, "voting"),
            Self::GameOver => write!(f, "game_over"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_is_active() {
        assert!(!Phase::Lobby.is_active());
        assert!(Phase::Night.is_active());
        assert!(Phase::Day.is_active());
        assert!(Phase::Voting.is_active());
        assert!(!Phase::GameOver.is_active());
    }

    #[test]
    fn test_phase_display_matches_wire_name() {
        assert_eq!(Phase::GameOver.to_string(), "game_over");
        assert_eq!(
            serde_json::to_string(&Phase::GameOver).unwrap(),
            "\"game_over\""
        );
    }
}
