//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every room a [`RoomManager`](crate::RoomManager)
/// creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Seats per room. Joins beyond this fail with
    /// [`RoomError::RoomFull`](crate::RoomError::RoomFull).
    pub max_players: usize,

    /// How long a night or vote result stays on screen before the room
    /// announces the next phase.
    pub result_display_delay: Duration,

    /// Capacity of each room's command channel. A full channel makes
    /// callers wait.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 20,
            result_display_delay: Duration::from_secs(5),
            channel_size: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.max_players, 20);
        assert_eq!(config.result_display_delay, Duration::from_secs(5));
        assert_eq!(config.channel_size, 64);
    }

    #[test]
    fn test_room_config_deserializes_overrides() {
        let config: RoomConfig = serde_json::from_str(
            r#"{"max_players": 10, "result_display_delay": {"secs": 1, "nanos": 0}, "channel_size": 8}"#,
        )
        .unwrap();
        assert_eq!(config.max_players, 10);
        assert_eq!(config.result_display_delay, Duration::from_secs(1));
    }
}
