//! Wire protocol for the Mafia server.
//!
//! This crate defines what travels between a player's client and the
//! server:
//!
//! - **Types** ([`Envelope`], [`Payload`], [`SystemMessage`]) and the
//!   identifiers shared by every layer ([`PlayerId`], [`RoomCode`],
//!   [`Recipient`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) for turning those types into
//!   bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about game rules. Game traffic rides
//! inside [`Payload::Game`] as opaque bytes that the room layer decodes.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room (ClientAction / ServerEvent)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Envelope, Payload, PlayerId, Recipient, RoomCode, SystemMessage};

/// The protocol version clients must announce in their handshake.
pub const PROTOCOL_VERSION: u32 = 1;
