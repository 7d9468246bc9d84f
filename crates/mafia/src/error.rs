//! Unified error type for the server crate.

use mafia_protocol::ProtocolError;
use mafia_room::RoomError;
use mafia_transport::TransportError;

/// Top-level error that wraps the errors of every layer below the server.
///
/// The `#[from]` attributes let `?` lift sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MafiaError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, not found, rejected action).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    Config { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use mafia_protocol::RoomCode;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let mafia_err: MafiaError = err.into();
        assert!(matches!(mafia_err, MafiaError::Transport(_)));
        assert!(mafia_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let mafia_err: MafiaError = err.into();
        assert!(matches!(mafia_err, MafiaError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let code = RoomCode::parse("ZZZ999").unwrap();
        let mafia_err: MafiaError = RoomError::NotFound(code).into();
        assert!(matches!(mafia_err, MafiaError::Room(_)));
        assert_eq!(mafia_err.to_string(), "room ZZZ999 not found");
    }

    #[test]
    fn test_config_error_names_the_variable() {
        let err = MafiaError::Config {
            var: "MAFIA_BIND",
            value: "nowhere".into(),
        };
        assert_eq!(err.to_string(), "invalid value \"nowhere\" for MAFIA_BIND");
    }
}
