//! Rules engine for a single game of Mafia.
//!
//! A [`Game`] owns every player of one room and is the only place game
//! state changes. Each public operation validates its input, mutates the
//! game atomically, and returns an outcome describing what happened. It
//! never blocks and never performs I/O: deciding who hears about an outcome
//! is the room layer's job.
//!
//! # Key types
//!
//! - [`Game`]: the per-room state machine
//! - [`Phase`]: `Lobby → Night → Day → Voting → Night … → GameOver`
//! - [`Role`], [`NightActionKind`], [`Side`]: the closed rule tables
//! - [`GameError`] / [`ErrorKind`]: why an action was refused
//! - outcome and view types returned by operations and projections

mod error;
mod game;
mod outcome;
mod phase;
mod player;
mod role;
mod rules;
mod view;

pub use error::{ErrorKind, GameError};
pub use game::Game;
pub use outcome::{
    AcknowledgeOutcome, Departure, Eliminated, Investigation, MafiaConsensus,
    NightActionOutcome, NightResolution, Progress, ReadyOutcome, RoleAssignment,
    StartOutcome, VoteOutcome, VoteResolution,
};
pub use phase::Phase;
pub use player::Player;
pub use role::{NightActionKind, Role, Side};
pub use rules::{MIN_PLAYERS, deal_roles, evaluate_win, mafia_count};
pub use view::{Ballot, GameSnapshot, NightStatus, PlayerView, TargetTally, VoteTally};
