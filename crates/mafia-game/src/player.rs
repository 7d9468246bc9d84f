//! A participant in one game.

use mafia_protocol::PlayerId;
use serde::{Deserialize, Serialize};

use crate::Role;

/// One seat at the table.
///
/// Owned by its [`Game`](crate::Game); callers only ever see shared
/// references. `role` stays `None` until the game starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub alive: bool,
    pub host: bool,
}

impl Player {
    pub(crate) fn new(id: PlayerId, name: String, host: bool) -> Self {
        Self {
            id,
            name,
            role: None,
            alive: true,
            host,
        }
    }

    /// `true` if this player is alive and holds `role`.
    pub fn is_living(&self, role: Role) -> bool {
        self.alive && self.role == Some(role)
    }
}
