//! `MafiaServer` builder and accept loop.
//!
//! This is the entry point for running a Mafia server. It ties the layers
//! together: transport → protocol → rooms.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use mafia_protocol::{Codec, JsonCodec, PlayerId};
use mafia_room::{RoomConfig, RoomManager};
use mafia_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{MafiaError, ServerConfig};

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
    pub(crate) handshake_timeout: Duration,
    next_player: AtomicU64,
    started: Instant,
}

impl<C: Codec> ServerState<C> {
    /// Hands out the id for a freshly handshaken connection.
    pub(crate) fn next_player_id(&self) -> PlayerId {
        PlayerId(self.next_player.fetch_add(1, Ordering::Relaxed))
    }

    /// Milliseconds since the server started; the clock of every outbound
    /// envelope.
    pub(crate) fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Builder for configuring and starting a Mafia server.
///
/// # Example
///
/// ```rust,no_run
/// use mafia::prelude::*;
///
/// # async fn run() -> Result<(), MafiaError> {
/// let server = MafiaServer::builder()
///     .bind("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MafiaServerBuilder {
    config: ServerConfig,
}

impl MafiaServerBuilder {
    /// Creates a builder with [`ServerConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration used for every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Binds the listener and prepares the shared state.
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`.
    pub async fn build(self) -> Result<MafiaServer, MafiaError> {
        let ServerConfig {
            bind_addr,
            idle_timeout,
            handshake_timeout,
            room,
        } = self.config;

        let transport = WebSocketTransport::bind(&bind_addr).await?;
        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomManager::new(room)),
            codec: JsonCodec,
            idle_timeout,
            handshake_timeout,
            next_player: AtomicU64::new(1),
            started: Instant::now(),
        });

        Ok(MafiaServer { transport, state })
    }
}

/// A bound Mafia server speaking JSON over WebSocket.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct MafiaServer {
    transport: WebSocketTransport,
    state: Arc<ServerState<JsonCodec>>,
}

impl MafiaServer {
    /// Creates a new builder.
    pub fn builder() -> MafiaServerBuilder {
        MafiaServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, MafiaError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), MafiaError> {
        tracing::info!(addr = %self.local_addr()?, "mafia server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
