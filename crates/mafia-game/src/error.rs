//! Why the rules engine refused an action.

use mafia_protocol::PlayerId;

use crate::{NightActionKind, Phase, Role};

/// Errors returned by [`Game`](crate::Game) operations.
///
/// Every variant leaves the game untouched. Use [`GameError::kind`] to map
/// an error onto the coarse taxonomy clients see.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// No player with this id is in the game.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// The action belongs to a different phase.
    #[error("action requires {expected} phase, game is in {actual}")]
    PhaseMismatch { expected: Phase, actual: Phase },

    /// The game has left the lobby; no more joins or starts.
    #[error("game already started")]
    AlreadyStarted,

    /// The actor's role cannot perform this night action.
    #[error("a {role} cannot {action}")]
    RoleMismatch { role: Role, action: NightActionKind },

    /// Dead players do not act.
    #[error("player {0} is not alive")]
    NotAlive(PlayerId),

    /// Starting needs more players.
    #[error("need at least {required} players to start, have {actual}")]
    TooFewPlayers { required: usize, actual: usize },

    /// Only the host may start the game.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// The same id tried to join twice.
    #[error("player {0} already joined")]
    DuplicatePlayer(PlayerId),

    /// The action needs a target and none was given.
    #[error("{0} needs a target")]
    MissingTarget(NightActionKind),

    /// The target is unknown, dead, or otherwise not allowed.
    #[error("{0} is not a valid target")]
    InvalidTarget(PlayerId),

    /// The player already used their single action this night.
    #[error("player {0} already acted tonight")]
    AlreadyActed(PlayerId),

    /// Ballots are final once cast.
    #[error("player {0} already voted")]
    AlreadyVoted(PlayerId),

    /// The detective tried to acknowledge before investigating.
    #[error("player {0} has no investigation to acknowledge")]
    NothingToAcknowledge(PlayerId),
}

/// The client-facing error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PhaseMismatch,
    RoleMismatch,
    NotAlive,
    PreconditionUnmet,
}

impl ErrorKind {
    /// HTTP-style status code used on the wire.
    pub fn code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::PhaseMismatch => 409,
            Self::RoleMismatch => 403,
            Self::NotAlive => 410,
            Self::PreconditionUnmet => 412,
        }
    }
}

impl GameError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PlayerNotFound(_) => ErrorKind::NotFound,
            Self::PhaseMismatch { .. } | Self::AlreadyStarted => ErrorKind::PhaseMismatch,
            Self::RoleMismatch { .. } => ErrorKind::RoleMismatch,
            Self::NotAlive(_) => ErrorKind::NotAlive,
            Self::TooFewPlayers { .. }
            | Self::NotHost(_)
            | Self::DuplicatePlayer(_)
            | Self::MissingTarget(_)
            | Self::InvalidTarget(_)
            | Self::AlreadyActed(_)
            | Self::AlreadyVoted(_)
            | Self::NothingToAcknowledge(_) => ErrorKind::PreconditionUnmet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_mismatch_message_names_both_phases() {
        let err = GameError::PhaseMismatch {
            expected: Phase::Night,
            actual: Phase::Day,
        };
        assert_eq!(err.to_string(), "action requires night phase, game is in day");
        assert_eq!(err.kind().code(), 409);
    }

    #[test]
    fn test_role_mismatch_message() {
        let err = GameError::RoleMismatch {
            role: Role::Villager,
            action: NightActionKind::Kill,
        };
        assert_eq!(err.to_string(), "a villager cannot kill");
        assert_eq!(err.kind(), ErrorKind::RoleMismatch);
    }

    #[test]
    fn test_kind_codes_are_distinct() {
        let codes = [
            ErrorKind::NotFound,
            ErrorKind::PhaseMismatch,
            ErrorKind::RoleMismatch,
            ErrorKind::NotAlive,
            ErrorKind::PreconditionUnmet,
        ]
        .map(ErrorKind::code);
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_start_errors_are_classified() {
        assert_eq!(GameError::AlreadyStarted.kind(), ErrorKind::PhaseMismatch);
        assert_eq!(
            GameError::TooFewPlayers { required: 6, actual: 3 }.kind(),
            ErrorKind::PreconditionUnmet
        );
        assert_eq!(
            GameError::PlayerNotFound(PlayerId(1)).kind(),
            ErrorKind::NotFound
        );
    }
}
