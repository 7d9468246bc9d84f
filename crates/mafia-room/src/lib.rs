//! Rooms for the Mafia server.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! [`Game`](mafia_game::Game). The actor is the single writer for that
//! game: commands arrive on a bounded channel and are applied one at a
//! time, while distinct rooms run in parallel.
//!
//! # Key types
//!
//! - [`RoomManager`]: creates and destroys rooms, routes players
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`ClientAction`] / [`ServerEvent`]: game traffic in and out
//! - [`RoomConfig`]: seat limit, result pacing, channel size

mod config;
mod error;
mod manager;
mod message;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use manager::RoomManager;
pub use message::{ClientAction, NightSummary, ServerEvent, VoteCount, VoteSummary};
pub use room::{Joined, PlayerSender, RoomHandle, RoomInfo};
