//! Error types for the room layer.

use mafia_game::GameError;
use mafia_protocol::{PlayerId, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Every seat is taken.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The player already sits in a room; leave it first.
    #[error("player {0} is already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    /// The player is not in any room.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// The room's command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// The game refused the request.
    #[error(transparent)]
    Game(#[from] GameError),
}

impl RoomError {
    /// Wire code, in the same scheme as [`ErrorKind::code`](mafia_game::ErrorKind::code).
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::NotInRoom(_) => 404,
            Self::RoomFull(_) | Self::AlreadyInRoom(..) => 412,
            Self::Unavailable(_) => 503,
            Self::Game(err) => err.kind().code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_errors_keep_their_code() {
        let err = RoomError::from(GameError::AlreadyStarted);
        assert_eq!(err.code(), 409);
        assert_eq!(err.to_string(), "game already started");
    }

    #[test]
    fn test_room_error_codes() {
        let code = RoomCode::parse("ABC123").unwrap();
        assert_eq!(RoomError::NotFound(code.clone()).code(), 404);
        assert_eq!(RoomError::RoomFull(code.clone()).code(), 412);
        assert_eq!(RoomError::Unavailable(code).code(), 503);
    }
}
