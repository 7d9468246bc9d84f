//! What each [`Game`](crate::Game) operation reports back.
//!
//! Outcomes carry everything the room layer needs to notify players,
//! including secrets (roles, investigation results). Picking the audience
//! for each piece is the caller's responsibility.

use std::collections::BTreeMap;

use mafia_protocol::PlayerId;
use serde::{Deserialize, Serialize};

use crate::{Player, Role, Side};

/// One player's private role card, produced once at game start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub player_id: PlayerId,
    pub role: Role,
    /// Names of the other mafia members, empty for everyone else. Fixed at
    /// deal time and never recomputed.
    pub teammates: Vec<String>,
}

/// Result of starting the game.
#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub assignments: Vec<RoleAssignment>,
}

/// A detective's finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investigation {
    pub investigator: PlayerId,
    pub target: PlayerId,
    pub target_name: String,
    pub target_role: Role,
    pub is_mafia: bool,
}

/// State of the mafia's agreement after a kill submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MafiaConsensus {
    /// Not every living mafia member has voted, or their votes differ.
    Pending,
    /// Every living mafia member agrees; the kill is on the ledger.
    Reached(PlayerId),
}

/// A player who just left the living.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eliminated {
    pub player_id: PlayerId,
    pub name: String,
    pub role: Role,
}

impl Eliminated {
    pub(crate) fn from_player(player: &Player) -> Option<Self> {
        Some(Self {
            player_id: player.id,
            name: player.name.clone(),
            role: player.role?,
        })
    }
}

/// How a night played out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightResolution {
    /// Day number of the night that just ended.
    pub day: u32,
    pub killed: Option<Eliminated>,
    /// The mafia picked the same player the doctor protected.
    pub kill_blocked: bool,
    pub investigations: Vec<Investigation>,
    pub winner: Option<Side>,
}

impl NightResolution {
    pub fn game_over(&self) -> bool {
        self.winner.is_some()
    }
}

/// How a day vote played out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteResolution {
    pub day: u32,
    pub eliminated: Option<Eliminated>,
    pub tie: bool,
    /// Final count per target.
    pub counts: BTreeMap<PlayerId, usize>,
    pub winner: Option<Side>,
}

impl VoteResolution {
    pub fn game_over(&self) -> bool {
        self.winner.is_some()
    }
}

/// Result of a night action submission.
#[derive(Debug, Clone)]
pub struct NightActionOutcome {
    /// Set for kill submissions only.
    pub consensus: Option<MafiaConsensus>,
    /// Set for investigations: answered immediately, to the detective only.
    pub investigation: Option<Investigation>,
    /// Set when this submission completed the round.
    pub resolution: Option<NightResolution>,
}

impl NightActionOutcome {
    pub fn round_complete(&self) -> bool {
        self.resolution.is_some()
    }
}

/// Result of a detective acknowledging their finding.
#[derive(Debug, Clone)]
pub struct AcknowledgeOutcome {
    pub resolution: Option<NightResolution>,
}

impl AcknowledgeOutcome {
    pub fn round_complete(&self) -> bool {
        self.resolution.is_some()
    }
}

/// Result of a ready-to-vote signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyOutcome {
    pub ready: usize,
    pub living: usize,
    /// This signal was the last one and the game moved to voting.
    pub voting_started: bool,
}

/// Result of casting a ballot.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub resolution: Option<VoteResolution>,
}

impl VoteOutcome {
    pub fn all_votes_in(&self) -> bool {
        self.resolution.is_some()
    }
}

/// What a departure set in motion.
#[derive(Debug, Clone)]
pub enum Progress {
    /// Nothing changed beyond the seat being emptied.
    None,
    /// The leaver was the last one the night was waiting on.
    NightResolved(NightResolution),
    /// Everyone left standing was already ready.
    VotingStarted,
    /// Everyone left standing had already voted.
    VoteResolved(VoteResolution),
    /// The departure alone decided the game.
    GameOver(Side),
}

/// Result of removing a player.
#[derive(Debug, Clone)]
pub struct Departure {
    pub player: Player,
    /// The game has no players left and can be destroyed.
    pub empty: bool,
    pub progress: Progress,
}
