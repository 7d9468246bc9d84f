//! Read-only projections of a game, shaped for broadcasting.

use mafia_protocol::{PlayerId, RoomCode};
use serde::{Deserialize, Serialize};

use crate::{Phase, Role};

/// A player as everyone in the room may see them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
    pub host: bool,
    /// Revealed only for the dead, or for everyone once the game is over.
    pub role: Option<Role>,
}

/// The public state of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub room_code: RoomCode,
    pub phase: Phase,
    pub day: u32,
    pub players: Vec<PlayerView>,
    pub player_count: usize,
}

/// Which roles the night is still waiting on. Safe to show the whole room:
/// it says nothing about who holds a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightStatus {
    pub mafia_ready: bool,
    pub detective_ready: bool,
    pub doctor_ready: bool,
    pub villagers_ready: bool,
}

impl NightStatus {
    pub fn all_ready(&self) -> bool {
        self.mafia_ready && self.detective_ready && self.doctor_ready && self.villagers_ready
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub voter: PlayerId,
    pub target: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTally {
    pub target: PlayerId,
    pub count: usize,
    pub voters: Vec<String>,
}

/// The open ballot box: every ballot is public.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub ballots: Vec<Ballot>,
    pub targets: Vec<TargetTally>,
}
