//! # Mafia
//!
//! A moderator-less Mafia game server. Players connect over WebSocket,
//! open or join a room by its six-character code, and play through
//! night, day and voting phases with the server acting as narrator.
//!
//! The layers live in their own crates and are re-exported here:
//!
//! - [`mafia_transport`]: WebSocket listener and connections
//! - [`mafia_protocol`]: envelopes, system messages, the JSON codec
//! - [`mafia_game`]: roles, phases and the rules engine
//! - [`mafia_room`]: one actor task per room, plus the room registry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mafia::prelude::*;
//!
//! # async fn run() -> Result<(), MafiaError> {
//! let server = MafiaServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_BIND, ServerConfig};
pub use error::MafiaError;
pub use server::{MafiaServer, MafiaServerBuilder};

pub use mafia_game;
pub use mafia_protocol;
pub use mafia_room;
pub use mafia_transport;

/// The types needed to run a server and talk to it.
pub mod prelude {
    pub use crate::{MafiaError, MafiaServer, MafiaServerBuilder, ServerConfig};
    pub use mafia_game::{GameSnapshot, NightActionKind, Phase, Role, Side};
    pub use mafia_protocol::{
        Codec, Envelope, JsonCodec, PROTOCOL_VERSION, Payload, PlayerId, RoomCode, SystemMessage,
    };
    pub use mafia_room::{ClientAction, RoomConfig, ServerEvent};
}
