//! Server configuration, with environment overrides.

use std::str::FromStr;
use std::time::Duration;

use mafia_room::RoomConfig;

use crate::MafiaError;

/// Address the server listens on when `MAFIA_BIND` is unset.
pub const DEFAULT_BIND: &str = "0.0.0.0:3001";

/// Everything needed to start a [`MafiaServer`](crate::MafiaServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `host:port` to bind the WebSocket listener to.
    pub bind_addr: String,

    /// A connection that sends nothing for this long is dropped, and its
    /// player leaves their room. Heartbeats count as traffic.
    pub idle_timeout: Duration,

    /// How long a new connection has to send its `Handshake`.
    pub handshake_timeout: Duration,

    /// Settings for every room the server opens.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            idle_timeout: Duration::from_secs(60),
            handshake_timeout: Duration::from_secs(5),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults, overridden by `MAFIA_BIND`, `MAFIA_IDLE_TIMEOUT_SECS` and
    /// `MAFIA_RESULT_DELAY_MS` where they are set.
    ///
    /// # Errors
    /// Returns [`MafiaError::Config`] if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, MafiaError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, MafiaError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("MAFIA_BIND") {
            if addr.trim().is_empty() {
                return Err(MafiaError::Config {
                    var: "MAFIA_BIND",
                    value: addr,
                });
            }
            config.bind_addr = addr.trim().to_string();
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "MAFIA_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "MAFIA_RESULT_DELAY_MS")? {
            config.room.result_display_delay = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, MafiaError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| MafiaError::Config { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.room, RoomConfig::default());
    }

    #[test]
    fn test_from_lookup_empty_env_gives_defaults() {
        let config = ServerConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_from_lookup_applies_overrides() {
        let config = ServerConfig::from_lookup(env(&[
            ("MAFIA_BIND", "127.0.0.1:9000"),
            ("MAFIA_IDLE_TIMEOUT_SECS", "15"),
            ("MAFIA_RESULT_DELAY_MS", " 250 "),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.idle_timeout, Duration::from_secs(15));
        assert_eq!(config.room.result_display_delay, Duration::from_millis(250));
        assert_eq!(config.room.max_players, 20);
    }

    #[test]
    fn test_from_lookup_bad_number_is_error() {
        let err = ServerConfig::from_lookup(env(&[("MAFIA_IDLE_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            MafiaError::Config { var: "MAFIA_IDLE_TIMEOUT_SECS", ref value } if value == "soon"
        ));
    }

    #[test]
    fn test_from_lookup_blank_bind_is_error() {
        let err = ServerConfig::from_lookup(env(&[("MAFIA_BIND", "  ")])).unwrap_err();
        assert!(matches!(err, MafiaError::Config { var: "MAFIA_BIND", .. }));
    }
}
