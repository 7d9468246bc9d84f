//! Core protocol types for the Mafia wire format.
//!
//! Everything in this module is serialized with serde and sent over the
//! socket, so the serde attributes here ARE the wire contract. The tests at
//! the bottom pin the JSON shapes clients rely on.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a player, assigned by the server when a
/// connection completes its handshake and stable for that connection.
///
/// Serialized as a plain number (`#[serde(transparent)]`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The short code players type to find a room, e.g. `"K7Q2ZD"`.
///
/// Codes are [`RoomCode::LEN`] characters drawn from [`RoomCode::ALPHABET`].
/// Use [`RoomCode::parse`] for user input (it trims and upper-cases) and
/// [`RoomCode::random`] to mint a new one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in a room code.
    pub const LEN: usize = 6;

    /// Characters a room code may contain.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Generates a random code. Uniqueness is the registry's job.
    pub fn random(rng: &mut impl Rng) -> Self {
        let code = (0..Self::LEN)
            .map(|_| {
                let idx = rng.random_range(0..Self::ALPHABET.len());
                Self::ALPHABET[idx] as char
            })
            .collect();
        Self(code)
    }

    /// Parses user-supplied input into a code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the input is not
    /// exactly [`RoomCode::LEN`] alphanumeric characters.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == Self::LEN
            && code.bytes().all(|b| Self::ALPHABET.contains(&b));
        if !valid {
            return Err(ProtocolError::InvalidMessage(format!(
                "room code must be {} letters or digits, got {input:?}",
                Self::LEN
            )));
        }
        Ok(Self(code))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive an outbound game event.
///
/// The room layer pairs every event it emits with a `Recipient`. Hidden
/// information (roles, investigation results, the mafia's live votes) is
/// only ever addressed with [`Recipient::Player`] or [`Recipient::Players`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every player in the room.
    All,

    /// One specific player.
    Player(PlayerId),

    /// A fixed subset, e.g. the living mafia.
    Players(Vec<PlayerId>),
}

impl Recipient {
    /// Returns `true` if `player` is part of this audience.
    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(p) => *p == player,
            Self::Players(ps) => ps.contains(&player),
        }
    }
}

// ---------------------------------------------------------------------------
// SystemMessage
// ---------------------------------------------------------------------------

/// Connection and room-management messages handled by the server itself.
///
/// Internally tagged: `{"type": "JoinRoom", "room_code": "ABC123", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    // -- Connection lifecycle --
    /// Client → Server: first frame on every connection.
    Handshake { version: u32 },

    /// Server → Client: the handshake was accepted and this connection
    /// now speaks as `player_id`.
    HandshakeAck { player_id: PlayerId, server_time: u64 },

    /// Either direction: the connection is about to close.
    Disconnect { reason: String },

    /// Client → Server: keep-alive.
    Heartbeat { client_time: u64 },

    /// Server → Client: keep-alive reply with both clocks.
    HeartbeatAck { client_time: u64, server_time: u64 },

    // -- Rooms --
    /// Client → Server: open a new room and join it as host.
    CreateRoom { player_name: String },

    /// Client → Server: join an existing room by code.
    JoinRoom {
        room_code: String,
        player_name: String,
    },

    /// Server → Client: the create/join succeeded.
    RoomJoined {
        room_code: RoomCode,
        player_id: PlayerId,
        is_host: bool,
    },

    /// Client → Server: leave the current room. Same effect as
    /// disconnecting: the player is removed from the game.
    LeaveRoom,

    // -- Errors --
    /// Server → Client: a request failed. `code` follows HTTP conventions
    /// (404 not found, 409 wrong phase, 412 precondition failed, ...).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// The content of an envelope.
///
/// Adjacently tagged: `{"type": "System", "data": {...}}` or
/// `{"type": "Game", "data": [..bytes..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// A connection or room-management message.
    System(SystemMessage),

    /// Game traffic, encoded by the codec and opaque to this crate.
    Game(Vec<u8>),
}

/// Every frame on the wire is an `Envelope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-direction sequence number.
    pub seq: u64,

    /// Milliseconds since the sender's clock origin (server start for
    /// outbound frames).
    pub timestamp: u64,

    pub payload: Payload,
}

impl Envelope {
    /// Convenience constructor for a system-message envelope.
    pub fn system(seq: u64, timestamp: u64, msg: SystemMessage) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::System(msg),
        }
    }

    /// Convenience constructor for a game-payload envelope.
    pub fn game(seq: u64, timestamp: u64, data: Vec<u8>) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::Game(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let code = RoomCode::parse("ab12cd").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"AB12CD\"");
    }

    #[test]
    fn test_room_code_parse_rejects_wrong_length() {
        assert!(RoomCode::parse("ABC").is_err());
        assert!(RoomCode::parse("ABCDEFG").is_err());
    }

    #[test]
    fn test_room_code_parse_rejects_symbols() {
        assert!(RoomCode::parse("AB-12C").is_err());
    }

    #[test]
    fn test_room_code_parse_trims_and_uppercases() {
        let code = RoomCode::parse("  k7q2zd ").unwrap();
        assert_eq!(code.as_str(), "K7Q2ZD");
    }

    #[test]
    fn test_room_code_random_uses_alphabet() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let code = RoomCode::random(&mut rng);
            assert_eq!(code.as_str().len(), RoomCode::LEN);
            assert!(RoomCode::parse(code.as_str()).is_ok());
        }
    }

    #[test]
    fn test_recipient_includes() {
        assert!(Recipient::All.includes(PlayerId(1)));
        assert!(Recipient::Player(PlayerId(1)).includes(PlayerId(1)));
        assert!(!Recipient::Player(PlayerId(1)).includes(PlayerId(2)));
        let subset = Recipient::Players(vec![PlayerId(3), PlayerId(4)]);
        assert!(subset.includes(PlayerId(4)));
        assert!(!subset.includes(PlayerId(5)));
    }

    #[test]
    fn test_system_message_handshake_json_format() {
        let msg = SystemMessage::Handshake { version: 1 };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Handshake");
        assert_eq!(json["version"], 1);
    }

    #[test]
    fn test_system_message_join_room_json_format() {
        let msg = SystemMessage::JoinRoom {
            room_code: "ABC123".into(),
            player_name: "Vera".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "JoinRoom");
        assert_eq!(json["room_code"], "ABC123");
        assert_eq!(json["player_name"], "Vera");
    }

    #[test]
    fn test_system_message_room_joined_json_format() {
        let msg = SystemMessage::RoomJoined {
            room_code: RoomCode::parse("ABC123").unwrap(),
            player_id: PlayerId(9),
            is_host: true,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "RoomJoined");
        assert_eq!(json["room_code"], "ABC123");
        assert_eq!(json["player_id"], 9);
        assert_eq!(json["is_host"], true);
    }

    #[test]
    fn test_system_message_error_json_format() {
        let msg = SystemMessage::Error {
            code: 409,
            message: "not night phase".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 409);
    }

    #[test]
    fn test_payload_game_json_format() {
        let payload = Payload::Game(vec![1, 2, 3]);
        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "Game");
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_envelope_system_constructor() {
        let env = Envelope::system(3, 100, SystemMessage::LeaveRoom);
        let json: serde_json::Value = serde_json::to_value(&env).unwrap();
        assert_eq!(json["seq"], 3);
        assert_eq!(json["payload"]["type"], "System");
        assert_eq!(json["payload"]["data"]["type"], "LeaveRoom");
    }

    #[test]
    fn test_decode_unknown_system_message_type_returns_error() {
        let unknown = r#"{"type": "SkipNight"}"#;
        let result: Result<SystemMessage, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }
}
