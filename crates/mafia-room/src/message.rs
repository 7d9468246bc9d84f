//! Game traffic exchanged between a room and its players.
//!
//! Both enums travel inside [`Payload::Game`](mafia_protocol::Payload)
//! frames, encoded with the server's codec. They are internally tagged:
//! `{"type": "CastVote", "target": 4}`.

use std::collections::BTreeMap;

use mafia_game::{
    Ballot, Eliminated, GameSnapshot, NightActionKind, NightResolution, NightStatus, Phase, Role, Side,
    VoteResolution, VoteTally,
};
use mafia_protocol::PlayerId;
use serde::{Deserialize, Serialize};

/// A request from a player to their room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientAction {
    /// Host only: deal roles and begin the first night.
    StartGame,

    /// Submit this night's action. Mafia kills may be resubmitted until
    /// the team agrees.
    NightAction {
        action: NightActionKind,
        #[serde(default)]
        target: Option<PlayerId>,
    },

    /// Mafia only: move a live proposal without committing to it.
    MafiaVote { target: PlayerId },

    /// Detective only: the investigation result has been seen.
    AcknowledgeInvestigation,

    /// Done discussing for today.
    ReadyToVote,

    /// Cast the day's single ballot.
    CastVote { target: PlayerId },
}

/// Public summary of a night. Investigations are left out: each detective
/// already received theirs privately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightSummary {
    pub day: u32,
    pub killed: Option<Eliminated>,
    pub saved: bool,
    pub game_over: bool,
    pub winner: Option<Side>,
}

impl From<&NightResolution> for NightSummary {
    fn from(night: &NightResolution) -> Self {
        Self {
            day: night.day,
            killed: night.killed.clone(),
            saved: night.kill_blocked,
            game_over: night.game_over(),
            winner: night.winner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub target: PlayerId,
    pub count: usize,
}

/// Public summary of a day vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSummary {
    pub day: u32,
    pub eliminated: Option<Eliminated>,
    pub tie: bool,
    pub counts: Vec<VoteCount>,
    pub game_over: bool,
    pub winner: Option<Side>,
}

impl From<&VoteResolution> for VoteSummary {
    fn from(vote: &VoteResolution) -> Self {
        Self {
            day: vote.day,
            eliminated: vote.eliminated.clone(),
            tie: vote.tie,
            counts: vote
                .counts
                .iter()
                .map(|(target, count)| VoteCount {
                    target: *target,
                    count: *count,
                })
                .collect(),
            game_over: vote.game_over(),
            winner: vote.winner,
        }
    }
}

/// Everything a room tells its players. Each variant has a fixed audience;
/// see the room actor for who receives what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// The public room state changed.
    RoomUpdate(GameSnapshot),

    PlayerLeft { player_id: PlayerId, name: String },

    /// Private: your role, and your fellow mafia if you are one.
    RoleAssigned { role: Role, teammates: Vec<String> },

    GameStarted(GameSnapshot),

    /// Living mafia only: the team's current proposals.
    MafiaVoteUpdate { votes: Vec<Ballot> },

    /// Which roles the night is still waiting on.
    NightStatus(NightStatus),

    /// Detective only.
    InvestigationResult {
        target: PlayerId,
        target_name: String,
        is_mafia: bool,
    },

    NightResult(NightSummary),

    ReadyUpdate { ready: usize, living: usize },

    /// The open ballot box after each vote.
    VoteUpdate(VoteTally),

    VoteResult(VoteSummary),

    PhaseChanged { phase: Phase },

    GameOver { winner: Side, message: String },

    /// Requester only: the last action was refused. `code` uses the same
    /// scheme as system errors.
    ActionRejected { code: u16, message: String },
}

impl ServerEvent {
    pub(crate) fn mafia_votes(votes: &BTreeMap<PlayerId, PlayerId>) -> Self {
        Self::MafiaVoteUpdate {
            votes: votes
                .iter()
                .map(|(voter, target)| Ballot {
                    voter: *voter,
                    target: *target,
                })
                .collect(),
        }
    }

    pub(crate) fn game_over(winner: Side) -> Self {
        Self::GameOver {
            winner,
            message: winner.victory_message().to_owned(),
        }
    }
}
