//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating wire
/// messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, or a
    /// message shape the server does not know.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but breaks a protocol rule, e.g. a
    /// handshake with the wrong version or a malformed room code.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
