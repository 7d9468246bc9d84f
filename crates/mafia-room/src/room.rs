//! Room actor: an isolated Tokio task that owns one [`Game`].
//!
//! Each room runs in its own task and is reached only through its command
//! channel, so every change to a game happens on one task, in arrival
//! order. Outcomes are turned into [`ServerEvent`]s, each addressed to the
//! players allowed to see it.
//!
//! Result screens are paced: after a night or vote resolves, the next phase
//! is announced only once `result_display_delay` has passed. The pending
//! announcement is a deadline inside the actor loop. If the next round
//! finishes first, the pending announcement goes out at once ahead of the
//! new results; shutting down drops it.

use std::collections::HashMap;

use mafia_game::{
    Departure, Game, NightResolution, Phase, Progress, Side, VoteResolution,
};
use mafia_protocol::{PlayerId, Recipient, RoomCode};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};

use crate::{ClientAction, NightSummary, RoomConfig, RoomError, ServerEvent, VoteSummary};

/// Channel sender for delivering events to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// Returned by a successful create or join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub room_code: RoomCode,
    pub is_host: bool,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<Joined, RoomError>>,
    },

    /// Replies with `true` if the room is now empty.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<bool, RoomError>>,
    },

    Action {
        player_id: PlayerId,
        action: ClientAction,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    Shutdown,
}

/// Room metadata (not the game state itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_code: RoomCode,
    pub phase: Phase,
    pub day: u32,
    pub player_count: usize,
    pub max_players: usize,
}

/// Handle to a running room actor.
///
/// Cheap to clone: it is just an `mpsc::Sender` wrapper. The
/// [`RoomManager`](crate::RoomManager) holds one per room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    /// Seats a player. `sender` receives every event addressed to them
    /// from now on.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<Joined, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            player_id,
            name,
            sender,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a player. Returns `true` if nobody is left.
    pub async fn leave(&self, player_id: PlayerId) -> Result<bool, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Leave { player_id, reply }).await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Delivers a player's action (fire-and-forget). Refusals come back to
    /// the player as [`ServerEvent::ActionRejected`].
    pub async fn act(&self, player_id: PlayerId, action: ClientAction) -> Result<(), RoomError> {
        self.send(RoomCommand::Action { player_id, action }).await
    }

    /// Requests the current room info. Because commands are handled in
    /// order, the reply also means every earlier command has been applied.
    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to shut down, dropping any pending announcement.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_code.clone())
    }
}

/// A phase announcement waiting for the result screen to finish.
#[derive(Debug, Clone, Copy)]
enum Announcement {
    Phase(Phase),
    GameOver(Side),
}

type Outbox = Vec<(Recipient, ServerEvent)>;

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_code: RoomCode,
    config: RoomConfig,
    game: Game,
    senders: HashMap<PlayerId, PlayerSender>,
    pending: Option<(Instant, Announcement)>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Processes commands and paced announcements until shutdown.
    async fn run(mut self) {
        tracing::info!(room_code = %self.room_code, "room actor started");

        loop {
            let deadline = self.pending.map(|(at, _)| at);
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                () = wait_until(deadline) => {
                    if let Some((_, announcement)) = self.pending.take() {
                        let out = self.announce(announcement);
                        self.dispatch(out);
                    }
                }
            }
        }

        tracing::info!(room_code = %self.room_code, "room actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_id, name, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.handle_leave(player_id);
                let _ = reply.send(result);
            }
            RoomCommand::Action { player_id, action } => {
                self.handle_action(player_id, action);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_code = %self.room_code, "room shutting down");
                self.pending = None;
                return false;
            }
        }
        true
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<Joined, RoomError> {
        if self.senders.contains_key(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, self.room_code.clone()));
        }
        if self.game.players().len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.room_code.clone()));
        }

        let is_host = self.game.add_player(player_id, name)?.host;
        self.senders.insert(player_id, sender);
        tracing::info!(
            room_code = %self.room_code,
            %player_id,
            players = self.senders.len(),
            "player joined"
        );

        self.dispatch(vec![(Recipient::All, ServerEvent::RoomUpdate(self.game.snapshot()))]);
        Ok(Joined {
            room_code: self.room_code.clone(),
            is_host,
        })
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<bool, RoomError> {
        if self.senders.remove(&player_id).is_none() {
            return Err(RoomError::NotInRoom(player_id));
        }
        let Departure {
            player,
            empty,
            progress,
        } = self.game.remove_player(player_id)?;

        tracing::info!(
            room_code = %self.room_code,
            %player_id,
            players = self.senders.len(),
            "player left"
        );

        let mut out = vec![
            (
                Recipient::All,
                ServerEvent::PlayerLeft {
                    player_id,
                    name: player.name,
                },
            ),
            (Recipient::All, ServerEvent::RoomUpdate(self.game.snapshot())),
        ];
        match progress {
            Progress::None => {}
            Progress::NightResolved(night) => self.night_resolved(&night, &mut out),
            Progress::VotingStarted => self.voting_started(&mut out),
            Progress::VoteResolved(vote) => self.vote_resolved(&vote, &mut out),
            Progress::GameOver(winner) => {
                self.pending = None;
                out.push((Recipient::All, ServerEvent::game_over(winner)));
            }
        }
        self.dispatch(out);
        Ok(empty)
    }

    fn handle_action(&mut self, player_id: PlayerId, action: ClientAction) {
        if !self.senders.contains_key(&player_id) {
            tracing::warn!(room_code = %self.room_code, %player_id, "action from non-member, ignoring");
            return;
        }

        match self.apply(player_id, action) {
            Ok(out) => self.dispatch(out),
            Err(err) => {
                tracing::debug!(
                    room_code = %self.room_code,
                    %player_id,
                    error = %err,
                    "action rejected"
                );
                self.send_to(
                    player_id,
                    ServerEvent::ActionRejected {
                        code: err.code(),
                        message: err.to_string(),
                    },
                );
            }
        }
    }

    /// Runs one action against the game and collects the events it causes.
    fn apply(&mut self, player_id: PlayerId, action: ClientAction) -> Result<Outbox, RoomError> {
        let mut out = Outbox::new();
        match action {
            ClientAction::StartGame => {
                let started = self.game.start(player_id, &mut rand::rng())?;
                for assignment in started.assignments {
                    out.push((
                        Recipient::Player(assignment.player_id),
                        ServerEvent::RoleAssigned {
                            role: assignment.role,
                            teammates: assignment.teammates,
                        },
                    ));
                }
                out.push((Recipient::All, ServerEvent::GameStarted(self.game.snapshot())));
            }
            ClientAction::NightAction { action, target } => {
                let outcome = self.game.submit_night_action(player_id, action, target)?;
                if let Some(found) = outcome.investigation {
                    out.push((
                        Recipient::Player(found.investigator),
                        ServerEvent::InvestigationResult {
                            target: found.target,
                            target_name: found.target_name,
                            is_mafia: found.is_mafia,
                        },
                    ));
                }
                match outcome.resolution {
                    Some(night) => self.night_resolved(&night, &mut out),
                    None => {
                        if outcome.consensus.is_some() {
                            out.push(self.mafia_vote_update());
                        }
                        out.push(self.night_status());
                    }
                }
            }
            ClientAction::MafiaVote { target } => {
                self.game.update_mafia_vote(player_id, target)?;
                out.push(self.mafia_vote_update());
                out.push(self.night_status());
            }
            ClientAction::AcknowledgeInvestigation => {
                let outcome = self.game.acknowledge_investigation(player_id)?;
                match outcome.resolution {
                    Some(night) => self.night_resolved(&night, &mut out),
                    None => out.push(self.night_status()),
                }
            }
            ClientAction::ReadyToVote => {
                let ready = self.game.mark_ready(player_id)?;
                out.push((
                    Recipient::All,
                    ServerEvent::ReadyUpdate {
                        ready: ready.ready,
                        living: ready.living,
                    },
                ));
                if ready.voting_started {
                    self.voting_started(&mut out);
                }
            }
            ClientAction::CastVote { target } => {
                let outcome = self.game.cast_vote(player_id, target)?;
                match outcome.resolution {
                    Some(vote) => self.vote_resolved(&vote, &mut out),
                    None => out.push((Recipient::All, ServerEvent::VoteUpdate(self.game.vote_tally()))),
                }
            }
        }
        Ok(out)
    }

    fn mafia_vote_update(&self) -> (Recipient, ServerEvent) {
        (
            Recipient::Players(self.game.living_mafia()),
            ServerEvent::mafia_votes(self.game.mafia_votes()),
        )
    }

    fn night_status(&self) -> (Recipient, ServerEvent) {
        (Recipient::All, ServerEvent::NightStatus(self.game.night_status()))
    }

    /// A night that ends the game is announced at once; otherwise day
    /// breaks after the result screen.
    fn night_resolved(&mut self, night: &NightResolution, out: &mut Outbox) {
        self.flush_pending(out);
        out.push((Recipient::All, ServerEvent::NightResult(NightSummary::from(night))));
        match night.winner {
            Some(winner) => out.extend(self.announce(Announcement::GameOver(winner))),
            None => self.schedule(Announcement::Phase(Phase::Day)),
        }
    }

    /// Vote results always stay on screen for the full delay, even when
    /// they end the game.
    fn vote_resolved(&mut self, vote: &VoteResolution, out: &mut Outbox) {
        self.flush_pending(out);
        out.push((Recipient::All, ServerEvent::VoteResult(VoteSummary::from(vote))));
        match vote.winner {
            Some(winner) => self.schedule(Announcement::GameOver(winner)),
            None => self.schedule(Announcement::Phase(Phase::Night)),
        }
    }

    fn voting_started(&mut self, out: &mut Outbox) {
        self.flush_pending(out);
        out.push((Recipient::All, ServerEvent::PhaseChanged { phase: Phase::Voting }));
    }

    /// Announces a still-pending phase change right away. A round that
    /// completes inside the display window must not skip it.
    fn flush_pending(&mut self, out: &mut Outbox) {
        if let Some((_, announcement)) = self.pending.take() {
            tracing::debug!(room_code = %self.room_code, ?announcement, "flushing pending announcement early");
            out.extend(self.announce(announcement));
        }
    }

    fn schedule(&mut self, announcement: Announcement) {
        let at = Instant::now() + self.config.result_display_delay;
        self.pending = Some((at, announcement));
    }

    fn announce(&self, announcement: Announcement) -> Outbox {
        let snapshot = (Recipient::All, ServerEvent::RoomUpdate(self.game.snapshot()));
        match announcement {
            Announcement::Phase(phase) => vec![
                (Recipient::All, ServerEvent::PhaseChanged { phase }),
                snapshot,
            ],
            Announcement::GameOver(winner) => {
                vec![snapshot, (Recipient::All, ServerEvent::game_over(winner))]
            }
        }
    }

    /// Delivers outbound events to their recipients.
    fn dispatch(&self, out: Outbox) {
        for (recipient, event) in out {
            match recipient {
                Recipient::All => {
                    for sender in self.senders.values() {
                        let _ = sender.send(event.clone());
                    }
                }
                Recipient::Player(pid) => self.send_to(pid, event),
                Recipient::Players(pids) => {
                    for pid in pids {
                        self.send_to(pid, event.clone());
                    }
                }
            }
        }
    }

    /// Sends to one player. Silently drops if their connection is gone.
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_code: self.room_code.clone(),
            phase: self.game.phase(),
            day: self.game.day(),
            player_count: self.game.players().len(),
            max_players: self.config.max_players,
        }
    }
}

/// Sleeps until `deadline`, or forever if there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
pub(crate) fn spawn_room(room_code: RoomCode, config: RoomConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let actor = RoomActor {
        room_code: room_code.clone(),
        game: Game::new(room_code.clone()),
        config,
        senders: HashMap::new(),
        pending: None,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_code,
        sender: tx,
    }
}
