//! Room manager: creates, tracks, and routes players to rooms.

use std::collections::HashMap;

use mafia_protocol::{PlayerId, RoomCode};

use crate::room::spawn_room;
use crate::{ClientAction, Joined, PlayerSender, RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Registry of every live room, keyed by room code, plus the index of
/// which player sits where.
///
/// This is the entry point for room operations from the server. A player
/// is in at most one room at a time, and a room is destroyed as soon as its
/// last player leaves.
pub struct RoomManager {
    config: RoomConfig,
    rooms: HashMap<RoomCode, RoomHandle>,
    player_rooms: HashMap<PlayerId, RoomCode>,
}

impl RoomManager {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a room under a fresh code and seats `player_id` as its host.
    pub async fn create_room(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<Joined, RoomError> {
        self.ensure_free(player_id)?;

        let room_code = self.fresh_code();
        let handle = spawn_room(room_code.clone(), self.config.clone());
        tracing::info!(%room_code, host = %player_id, "room created");

        let joined = match handle.join(player_id, name, sender).await {
            Ok(joined) => joined,
            Err(err) => {
                let _ = handle.shutdown().await;
                return Err(err);
            }
        };
        self.rooms.insert(room_code.clone(), handle);
        self.player_rooms.insert(player_id, room_code);
        Ok(joined)
    }

    /// Seats `player_id` in an existing room.
    pub async fn join_room(
        &mut self,
        player_id: PlayerId,
        room_code: &RoomCode,
        name: String,
        sender: PlayerSender,
    ) -> Result<Joined, RoomError> {
        self.ensure_free(player_id)?;

        let handle = self
            .rooms
            .get(room_code)
            .ok_or_else(|| RoomError::NotFound(room_code.clone()))?;
        let joined = handle.join(player_id, name, sender).await?;
        self.player_rooms.insert(player_id, room_code.clone());
        Ok(joined)
    }

    /// Removes a player from their room, destroying the room if that was
    /// its last player. Returns the code of the room they left.
    pub async fn leave_room(&mut self, player_id: PlayerId) -> Result<RoomCode, RoomError> {
        let room_code = self
            .player_rooms
            .remove(&player_id)
            .ok_or(RoomError::NotInRoom(player_id))?;

        let empty = match self.rooms.get(&room_code) {
            Some(handle) => handle.leave(player_id).await?,
            None => false,
        };
        if empty {
            self.destroy_room(&room_code).await?;
        }
        Ok(room_code)
    }

    /// Routes an action from a player to their current room.
    pub async fn route_action(
        &self,
        player_id: PlayerId,
        action: ClientAction,
    ) -> Result<(), RoomError> {
        self.handle_for(player_id)?.act(player_id, action).await
    }

    /// Returns info about a specific room.
    pub async fn room_info(&self, room_code: &RoomCode) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .get(room_code)
            .ok_or_else(|| RoomError::NotFound(room_code.clone()))?;
        handle.get_info().await
    }

    /// Shuts down a room and forgets everyone who was in it.
    pub async fn destroy_room(&mut self, room_code: &RoomCode) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_code)
            .ok_or_else(|| RoomError::NotFound(room_code.clone()))?;

        let _ = handle.shutdown().await;
        self.player_rooms.retain(|_, code| code != room_code);

        tracing::info!(%room_code, "room destroyed");
        Ok(())
    }

    /// The room a player is currently in, if any.
    pub fn player_room(&self, player_id: PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(&player_id)
    }

    /// The handle of the player's room. Clone it to talk to the room after
    /// releasing the manager.
    pub fn handle_for(&self, player_id: PlayerId) -> Result<&RoomHandle, RoomError> {
        let room_code = self
            .player_rooms
            .get(&player_id)
            .ok_or(RoomError::NotInRoom(player_id))?;
        self.rooms
            .get(room_code)
            .ok_or_else(|| RoomError::NotFound(room_code.clone()))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().cloned().collect()
    }

    fn ensure_free(&self, player_id: PlayerId) -> Result<(), RoomError> {
        match self.player_rooms.get(&player_id) {
            Some(current) => Err(RoomError::AlreadyInRoom(player_id, current.clone())),
            None => Ok(()),
        }
    }

    /// Draws codes until one is not in use.
    fn fresh_code(&self) -> RoomCode {
        let mut rng = rand::rng();
        loop {
            let code = RoomCode::random(&mut rng);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
