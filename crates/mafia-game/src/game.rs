//! The per-room game state machine.

use std::collections::{BTreeMap, BTreeSet};

use mafia_protocol::{PlayerId, RoomCode};
use rand::Rng;
use tracing::{debug, info};

use crate::{
    AcknowledgeOutcome, Ballot, Departure, Eliminated, GameError, GameSnapshot, Investigation,
    MafiaConsensus, NightActionKind, NightActionOutcome, NightResolution, NightStatus, Phase,
    Player, PlayerView, Progress, ReadyOutcome, Role, RoleAssignment, Side, StartOutcome,
    TargetTally, VoteOutcome, VoteResolution, VoteTally, deal_roles, evaluate_win, MIN_PLAYERS,
};

/// One entry of the night ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAction {
    kind: NightActionKind,
    target: Option<PlayerId>,
}

/// A single game of Mafia.
///
/// All state of one room lives here: the roster in join order, the phase,
/// the night ledger, the mafia's live votes, the day's ready set and
/// ballots. Every operation either fails with a [`GameError`] and changes
/// nothing, or applies completely and reports what happened.
///
/// Operations that can complete a round (a night action, an acknowledgement,
/// a ballot, a departure) resolve it inside the same call, so callers never
/// need a separate "advance" step.
#[derive(Debug, Clone)]
pub struct Game {
    room_code: RoomCode,
    phase: Phase,
    day: u32,
    players: Vec<Player>,
    night_actions: BTreeMap<PlayerId, PendingAction>,
    mafia_votes: BTreeMap<PlayerId, PlayerId>,
    ready: BTreeSet<PlayerId>,
    day_votes: BTreeMap<PlayerId, PlayerId>,
    investigation_acknowledged: bool,
    last_night: Option<NightResolution>,
    last_vote: Option<VoteResolution>,
    winner: Option<Side>,
}

impl Game {
    /// Creates an empty game in the lobby.
    pub fn new(room_code: RoomCode) -> Self {
        Self {
            room_code,
            phase: Phase::Lobby,
            day: 0,
            players: Vec::new(),
            night_actions: BTreeMap::new(),
            mafia_votes: BTreeMap::new(),
            ready: BTreeSet::new(),
            day_votes: BTreeMap::new(),
            investigation_acknowledged: false,
            last_night: None,
            last_vote: None,
            winner: None,
        }
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current day number; 0 in the lobby, 1 on the first night.
    pub fn day(&self) -> u32 {
        self.day
    }

    /// Players in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// The host, if they are still in the game.
    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.host)
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// Ids of every living mafia member: the audience for vote snapshots.
    pub fn living_mafia(&self) -> Vec<PlayerId> {
        self.living_with(Role::Mafia).map(|p| p.id).collect()
    }

    /// How the most recent night went, until the next night resolves.
    pub fn last_night(&self) -> Option<&NightResolution> {
        self.last_night.as_ref()
    }

    /// How the most recent day vote went, until the next vote resolves.
    pub fn last_vote(&self) -> Option<&VoteResolution> {
        self.last_vote.as_ref()
    }

    /// The mafia's current proposals, voter to target.
    pub fn mafia_votes(&self) -> &BTreeMap<PlayerId, PlayerId> {
        &self.mafia_votes
    }

    // -----------------------------------------------------------------------
    // Lobby
    // -----------------------------------------------------------------------

    /// Seats a new player. The first player to join becomes the host.
    ///
    /// # Errors
    /// [`GameError::AlreadyStarted`] once the game has left the lobby,
    /// [`GameError::DuplicatePlayer`] if `id` is already seated.
    pub fn add_player(&mut self, id: PlayerId, name: impl Into<String>) -> Result<&Player, GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::AlreadyStarted);
        }
        if self.player(id).is_some() {
            return Err(GameError::DuplicatePlayer(id));
        }

        let host = self.players.is_empty();
        self.players.push(Player::new(id, name.into(), host));
        info!(room_code = %self.room_code, player_id = %id, host, "player joined game");

        let idx = self.players.len() - 1;
        Ok(&self.players[idx])
    }

    /// Deals roles and moves to the first night.
    ///
    /// Only the host may start. If the host has already left, any seated
    /// player may.
    ///
    /// # Errors
    /// [`GameError::AlreadyStarted`], [`GameError::PlayerNotFound`],
    /// [`GameError::NotHost`], or [`GameError::TooFewPlayers`].
    pub fn start(&mut self, by: PlayerId, rng: &mut impl Rng) -> Result<StartOutcome, GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::AlreadyStarted);
        }
        let requester = self.player(by).ok_or(GameError::PlayerNotFound(by))?;
        if !requester.host && self.host().is_some() {
            return Err(GameError::NotHost(by));
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::TooFewPlayers {
                required: MIN_PLAYERS,
                actual: self.players.len(),
            });
        }

        let roles = deal_roles(self.players.len(), rng);
        for (player, role) in self.players.iter_mut().zip(roles) {
            player.role = Some(role);
            player.alive = true;
        }
        self.clear_night();
        self.clear_day();
        self.phase = Phase::Night;
        self.day = 1;

        let mafia: Vec<(PlayerId, &str)> = self
            .living_with(Role::Mafia)
            .map(|p| (p.id, p.name.as_str()))
            .collect();
        let assignments = self
            .players
            .iter()
            .filter_map(|p| {
                let role = p.role?;
                let teammates = if role.is_mafia() {
                    mafia
                        .iter()
                        .filter(|(id, _)| *id != p.id)
                        .map(|(_, name)| (*name).to_owned())
                        .collect()
                } else {
                    Vec::new()
                };
                Some(RoleAssignment {
                    player_id: p.id,
                    role,
                    teammates,
                })
            })
            .collect();

        info!(
            room_code = %self.room_code,
            players = self.players.len(),
            mafia = mafia.len(),
            "game started"
        );
        Ok(StartOutcome { assignments })
    }

    // -----------------------------------------------------------------------
    // Night
    // -----------------------------------------------------------------------

    /// Records a night action for `actor`.
    ///
    /// Kill submissions are mafia votes: they may be resubmitted, and the
    /// kill is only written to the ledger once every living mafia member
    /// names the same target. Everyone else acts once per night. An
    /// investigation is answered in the returned outcome right away.
    ///
    /// # Errors
    /// Fails without side effects if the actor is unknown or dead, it is not
    /// night, the action does not match the actor's role, the target is
    /// missing or not a living player, or the actor already acted.
    pub fn submit_night_action(
        &mut self,
        actor: PlayerId,
        kind: NightActionKind,
        target: Option<PlayerId>,
    ) -> Result<NightActionOutcome, GameError> {
        let role = self.night_actor(actor)?;
        if role.night_action() != kind {
            return Err(GameError::RoleMismatch { role, action: kind });
        }
        let target = match (kind.requires_target(), target) {
            (true, None) => return Err(GameError::MissingTarget(kind)),
            (true, Some(t)) => Some(self.living_target(t)?),
            (false, t) => t,
        };
        if kind != NightActionKind::Kill && self.night_actions.contains_key(&actor) {
            return Err(GameError::AlreadyActed(actor));
        }

        let mut consensus = None;
        let mut investigation = None;
        match (kind, target) {
            (NightActionKind::Kill, Some(t)) => {
                self.mafia_votes.insert(actor, t);
                consensus = Some(self.finalize_mafia_kill(actor));
                debug!(room_code = %self.room_code, player_id = %actor, target = %t, ?consensus, "mafia kill vote");
            }
            (NightActionKind::Investigate, Some(t)) => {
                self.night_actions.insert(actor, PendingAction { kind, target });
                investigation = self.investigation(actor, t);
                debug!(room_code = %self.room_code, player_id = %actor, target = %t, "investigation");
            }
            _ => {
                self.night_actions.insert(actor, PendingAction { kind, target });
                debug!(room_code = %self.room_code, player_id = %actor, action = %kind, "night action");
            }
        }

        Ok(NightActionOutcome {
            consensus,
            investigation,
            resolution: self.resolve_night_if_complete(),
        })
    }

    /// Moves `actor`'s live proposal to `target` without finalizing.
    ///
    /// If the proposals no longer agree on an already finalized kill, the
    /// kill is taken back off the ledger. Returns the full vote snapshot.
    ///
    /// # Errors
    /// As [`Game::submit_night_action`]; non-mafia get
    /// [`GameError::RoleMismatch`].
    pub fn update_mafia_vote(
        &mut self,
        actor: PlayerId,
        target: PlayerId,
    ) -> Result<BTreeMap<PlayerId, PlayerId>, GameError> {
        let role = self.night_actor(actor)?;
        if role != Role::Mafia {
            return Err(GameError::RoleMismatch {
                role,
                action: NightActionKind::Kill,
            });
        }
        let target = self.living_target(target)?;

        self.mafia_votes.insert(actor, target);
        self.unfinalize_stale_kill();
        debug!(room_code = %self.room_code, player_id = %actor, target = %target, "mafia vote updated");
        Ok(self.mafia_votes.clone())
    }

    /// Marks the detective's investigation as seen. The detective only
    /// counts as done for the night after this.
    ///
    /// # Errors
    /// [`GameError::RoleMismatch`] for non-detectives,
    /// [`GameError::NothingToAcknowledge`] before investigating.
    pub fn acknowledge_investigation(&mut self, actor: PlayerId) -> Result<AcknowledgeOutcome, GameError> {
        let role = self.night_actor(actor)?;
        if role != Role::Detective {
            return Err(GameError::RoleMismatch {
                role,
                action: NightActionKind::Investigate,
            });
        }
        let investigated = matches!(
            self.night_actions.get(&actor),
            Some(action) if action.kind == NightActionKind::Investigate
        );
        if !investigated {
            return Err(GameError::NothingToAcknowledge(actor));
        }

        self.investigation_acknowledged = true;
        Ok(AcknowledgeOutcome {
            resolution: self.resolve_night_if_complete(),
        })
    }

    /// Which roles the night is still waiting on. A role with no living
    /// holder is never waited on.
    pub fn night_status(&self) -> NightStatus {
        let acted = |p: &Player| self.night_actions.contains_key(&p.id);
        NightStatus {
            mafia_ready: self.living_with(Role::Mafia).next().is_none()
                || self.finalized_kill().is_some(),
            detective_ready: self
                .living_with(Role::Detective)
                .all(|p| acted(p) && self.investigation_acknowledged),
            doctor_ready: self.living_with(Role::Doctor).all(acted),
            villagers_ready: self.living_with(Role::Villager).all(acted),
        }
    }

    // -----------------------------------------------------------------------
    // Day
    // -----------------------------------------------------------------------

    /// Signals that `actor` is done discussing. Repeating the signal is
    /// harmless. The last living player to signal opens the vote.
    ///
    /// # Errors
    /// Fails if the actor is unknown or dead, or it is not day.
    pub fn mark_ready(&mut self, actor: PlayerId) -> Result<ReadyOutcome, GameError> {
        self.living_actor(actor, Phase::Day)?;
        self.ready.insert(actor);

        let voting_started = self.open_vote_if_all_ready();
        Ok(ReadyOutcome {
            ready: self.ready.len(),
            living: self.living_count(),
            voting_started,
        })
    }

    /// Casts `voter`'s ballot against `target`. Ballots are final. The last
    /// ballot resolves the vote.
    ///
    /// # Errors
    /// [`GameError::AlreadyVoted`] on a second ballot,
    /// [`GameError::InvalidTarget`] for self-votes or dead targets, plus the
    /// usual actor and phase checks.
    pub fn cast_vote(&mut self, voter: PlayerId, target: PlayerId) -> Result<VoteOutcome, GameError> {
        self.living_actor(voter, Phase::Voting)?;
        if self.day_votes.contains_key(&voter) {
            return Err(GameError::AlreadyVoted(voter));
        }
        if target == voter {
            return Err(GameError::InvalidTarget(target));
        }
        let target = self.living_target(target)?;

        self.day_votes.insert(voter, target);
        debug!(room_code = %self.room_code, player_id = %voter, target = %target, "vote cast");

        let resolution = if self.day_votes.len() >= self.living_count() {
            Some(self.resolve_vote())
        } else {
            None
        };
        Ok(VoteOutcome { resolution })
    }

    /// The open ballot box, in voter order, with per-target counts sorted
    /// by count (highest first).
    pub fn vote_tally(&self) -> VoteTally {
        let name = |id: &PlayerId| {
            self.player(*id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        let mut targets: BTreeMap<PlayerId, Vec<String>> = BTreeMap::new();
        for (voter, target) in &self.day_votes {
            targets.entry(*target).or_default().push(name(voter));
        }
        let mut targets: Vec<TargetTally> = targets
            .into_iter()
            .map(|(target, voters)| TargetTally {
                target,
                count: voters.len(),
                voters,
            })
            .collect();
        targets.sort_by(|a, b| b.count.cmp(&a.count));

        VoteTally {
            ballots: self
                .day_votes
                .iter()
                .map(|(voter, target)| Ballot {
                    voter: *voter,
                    target: *target,
                })
                .collect(),
            targets,
        }
    }

    // -----------------------------------------------------------------------
    // Departures and projections
    // -----------------------------------------------------------------------

    /// Removes a player in any phase.
    ///
    /// The player disappears from every buffer, along with any mafia vote or
    /// ballot naming them. The host seat is not handed on. During play the
    /// departure can decide the game or complete the current round; the
    /// outcome says which.
    ///
    /// # Errors
    /// [`GameError::PlayerNotFound`] if `id` is not seated.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Departure, GameError> {
        let idx = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(GameError::PlayerNotFound(id))?;
        let player = self.players.remove(idx);

        self.night_actions.remove(&id);
        self.mafia_votes.remove(&id);
        self.mafia_votes.retain(|_, target| *target != id);
        self.ready.remove(&id);
        self.day_votes.remove(&id);
        self.day_votes.retain(|_, target| *target != id);

        info!(room_code = %self.room_code, player_id = %id, phase = %self.phase, "player left game");

        let progress = if self.phase.is_active() {
            self.reevaluate()
        } else {
            Progress::None
        };
        Ok(Departure {
            player,
            empty: self.players.is_empty(),
            progress,
        })
    }

    /// The public view of the room. Roles of living players stay hidden
    /// until the game is over.
    pub fn snapshot(&self) -> GameSnapshot {
        let reveal_all = self.phase == Phase::GameOver;
        GameSnapshot {
            room_code: self.room_code.clone(),
            phase: self.phase,
            day: self.day,
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    id: p.id,
                    name: p.name.clone(),
                    alive: p.alive,
                    host: p.host,
                    role: if reveal_all || !p.alive { p.role } else { None },
                })
                .collect(),
            player_count: self.players.len(),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn living_with(&self, role: Role) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(move |p| p.is_living(role))
    }

    fn living_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    /// Checks the actor exists, is alive, and the game is in `phase`, in
    /// that order.
    fn living_actor(&self, id: PlayerId, phase: Phase) -> Result<&Player, GameError> {
        let player = self.player(id).ok_or(GameError::PlayerNotFound(id))?;
        if !player.alive {
            return Err(GameError::NotAlive(id));
        }
        if self.phase != phase {
            return Err(GameError::PhaseMismatch {
                expected: phase,
                actual: self.phase,
            });
        }
        Ok(player)
    }

    fn night_actor(&self, id: PlayerId) -> Result<Role, GameError> {
        let player = self.living_actor(id, Phase::Night)?;
        player.role.ok_or(GameError::PhaseMismatch {
            expected: Phase::Night,
            actual: Phase::Lobby,
        })
    }

    fn living_target(&self, id: PlayerId) -> Result<PlayerId, GameError> {
        match self.player(id) {
            Some(p) if p.alive => Ok(id),
            _ => Err(GameError::InvalidTarget(id)),
        }
    }

    fn investigation(&self, investigator: PlayerId, target: PlayerId) -> Option<Investigation> {
        let player = self.player(target)?;
        let role = player.role?;
        Some(Investigation {
            investigator,
            target,
            target_name: player.name.clone(),
            target_role: role,
            is_mafia: role.is_mafia(),
        })
    }

    /// The single target every living mafia member proposes, if any.
    fn mafia_consensus(&self) -> Option<PlayerId> {
        let targets: Option<BTreeSet<PlayerId>> = self
            .living_with(Role::Mafia)
            .map(|p| self.mafia_votes.get(&p.id).copied())
            .collect();
        match targets {
            Some(set) if set.len() == 1 => set.first().copied(),
            _ => None,
        }
    }

    fn finalized_kill(&self) -> Option<PlayerId> {
        self.night_actions
            .values()
            .find(|a| a.kind == NightActionKind::Kill)
            .and_then(|a| a.target)
    }

    /// Rewrites the ledger's kill entry from the current proposals, filed
    /// under `by`.
    fn finalize_mafia_kill(&mut self, by: PlayerId) -> MafiaConsensus {
        self.night_actions
            .retain(|_, a| a.kind != NightActionKind::Kill);
        match self.mafia_consensus() {
            Some(target) => {
                self.night_actions.insert(
                    by,
                    PendingAction {
                        kind: NightActionKind::Kill,
                        target: Some(target),
                    },
                );
                MafiaConsensus::Reached(target)
            }
            None => MafiaConsensus::Pending,
        }
    }

    fn unfinalize_stale_kill(&mut self) {
        let stale = self
            .finalized_kill()
            .is_some_and(|target| self.mafia_consensus() != Some(target));
        if stale {
            self.night_actions
                .retain(|_, a| a.kind != NightActionKind::Kill);
        }
    }

    fn resolve_night_if_complete(&mut self) -> Option<NightResolution> {
        if self.night_status().all_ready() {
            Some(self.resolve_night())
        } else {
            None
        }
    }

    fn resolve_night(&mut self) -> NightResolution {
        let kill = self.finalized_kill();
        let heal = self
            .night_actions
            .values()
            .find(|a| a.kind == NightActionKind::Heal)
            .and_then(|a| a.target);
        let kill_blocked = kill.is_some() && kill == heal;
        let killed = match kill {
            Some(target) if !kill_blocked => self.eliminate(target),
            _ => None,
        };
        let investigations = self
            .night_actions
            .iter()
            .filter(|(_, a)| a.kind == NightActionKind::Investigate)
            .filter_map(|(id, a)| a.target.and_then(|t| self.investigation(*id, t)))
            .collect();

        let day = self.day;
        self.clear_night();
        self.ready.clear();
        self.phase = Phase::Day;
        info!(
            room_code = %self.room_code,
            day,
            killed = ?killed.as_ref().map(|k: &Eliminated| k.player_id),
            kill_blocked,
            "night resolved"
        );

        let resolution = NightResolution {
            day,
            killed,
            kill_blocked,
            investigations,
            winner: self.check_winner(),
        };
        self.last_night = Some(resolution.clone());
        resolution
    }

    fn resolve_vote(&mut self) -> VoteResolution {
        let mut counts: BTreeMap<PlayerId, usize> = BTreeMap::new();
        for target in self.day_votes.values() {
            *counts.entry(*target).or_default() += 1;
        }
        let max = counts.values().copied().max().unwrap_or(0);
        let leaders: Vec<PlayerId> = counts
            .iter()
            .filter(|(_, count)| **count == max)
            .map(|(id, _)| *id)
            .collect();
        let tie = leaders.len() > 1;
        let eliminated = match leaders.as_slice() {
            [only] => self.eliminate(*only),
            _ => None,
        };

        let day = self.day;
        self.clear_day();
        self.mafia_votes.clear();
        info!(
            room_code = %self.room_code,
            day,
            eliminated = ?eliminated.as_ref().map(|e: &Eliminated| e.player_id),
            tie,
            "vote resolved"
        );

        let winner = self.check_winner();
        if winner.is_none() {
            self.clear_night();
            self.phase = Phase::Night;
            self.day += 1;
        }
        let resolution = VoteResolution {
            day,
            eliminated,
            tie,
            counts,
            winner,
        };
        self.last_vote = Some(resolution.clone());
        resolution
    }

    fn eliminate(&mut self, id: PlayerId) -> Option<Eliminated> {
        let player = self.players.iter_mut().find(|p| p.id == id)?;
        player.alive = false;
        Eliminated::from_player(player)
    }

    /// Ends the game if a side has won.
    fn check_winner(&mut self) -> Option<Side> {
        let mafia = self.living_with(Role::Mafia).count();
        let others = self.living_count() - mafia;
        let winner = evaluate_win(mafia, others)?;

        self.phase = Phase::GameOver;
        self.winner = Some(winner);
        info!(room_code = %self.room_code, winner = %winner, mafia, others, "game over");
        Some(winner)
    }

    /// After a departure: the win condition first, then whatever the
    /// current phase was waiting for.
    fn reevaluate(&mut self) -> Progress {
        if let Some(side) = self.check_winner() {
            return Progress::GameOver(side);
        }
        let phase = self.phase;
        match phase {
            Phase::Night => {
                self.unfinalize_stale_kill();
                if self.finalized_kill().is_none() {
                    let voter = self
                        .living_with(Role::Mafia)
                        .map(|p| p.id)
                        .find(|id| self.mafia_votes.contains_key(id));
                    if let Some(by) = voter {
                        self.finalize_mafia_kill(by);
                    }
                }
                match self.resolve_night_if_complete() {
                    Some(resolution) => Progress::NightResolved(resolution),
                    None => Progress::None,
                }
            }
            Phase::Day if self.open_vote_if_all_ready() => Progress::VotingStarted,
            Phase::Voting if self.day_votes.len() >= self.living_count() => {
                Progress::VoteResolved(self.resolve_vote())
            }
            _ => Progress::None,
        }
    }

    fn open_vote_if_all_ready(&mut self) -> bool {
        let living = self.living_count();
        if living == 0 || self.ready.len() < living {
            return false;
        }
        self.phase = Phase::Voting;
        info!(room_code = %self.room_code, day = self.day, "voting started");
        true
    }

    fn clear_night(&mut self) {
        self.night_actions.clear();
        self.mafia_votes.clear();
        self.investigation_acknowledged = false;
    }

    fn clear_day(&mut self) {
        self.ready.clear();
        self.day_votes.clear();
    }
}
