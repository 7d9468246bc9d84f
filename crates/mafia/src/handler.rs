//! Per-connection handler: handshake, then frame and event routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version → assign a PlayerId
//!   2. Send HandshakeAck
//!   3. Loop: inbound frames go to the server or the player's room, room
//!      events go back out as game envelopes

use std::sync::Arc;

use mafia_protocol::{
    Codec, Envelope, Payload, PlayerId, ProtocolError, RoomCode, SystemMessage, PROTOCOL_VERSION,
};
use mafia_room::{ClientAction, PlayerSender, RoomError, ServerEvent};
use mafia_transport::{Connection, TransportError, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until, timeout};

use crate::MafiaError;
use crate::server::ServerState;

/// Longest display name accepted on create or join, in characters.
const MAX_NAME_LEN: usize = 24;

/// Drop guard that takes the player out of their room when the handler
/// exits, however it exits.
///
/// `Drop` is synchronous, so the async cleanup runs on a spawned task.
struct SeatGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SeatGuard<C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut rooms = state.rooms.lock().await;
            match rooms.leave_room(player_id).await {
                Ok(room_code) => {
                    tracing::info!(%player_id, %room_code, "disconnected player left room");
                }
                Err(RoomError::NotInRoom(_)) => {}
                Err(e) => tracing::warn!(%player_id, error = %e, "cleanup after disconnect failed"),
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), MafiaError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let player_id = perform_handshake(&conn, &state).await?;
    tracing::info!(%conn_id, %player_id, "player connected");

    let _seat = SeatGuard {
        player_id,
        state: Arc::clone(&state),
    };
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut session = Session {
        conn: &conn,
        state: &state,
        player_id,
        events: events_tx,
        seq: 1,
    };

    let mut deadline = Instant::now() + state.idle_timeout;
    loop {
        // `recv` is cancel-safe: a partially read frame stays buffered in
        // the stream for the next call.
        tokio::select! {
            frame = conn.recv() => match frame? {
                Some(data) => {
                    deadline = Instant::now() + state.idle_timeout;
                    if session.handle_frame(&data).await? {
                        break;
                    }
                }
                None => {
                    tracing::info!(%player_id, "connection closed by peer");
                    break;
                }
            },
            Some(event) = events_rx.recv() => session.send_event(&event).await?,
            () = sleep_until(deadline) => {
                tracing::info!(%player_id, "connection idle, closing");
                session
                    .send_system(SystemMessage::Disconnect {
                        reason: "idle timeout".into(),
                    })
                    .await?;
                break;
            }
        }
    }

    let _ = conn.close().await;
    Ok(())
}

/// Receives the Handshake, checks its version, and acknowledges it with a
/// fresh player id.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
) -> Result<PlayerId, MafiaError> {
    let data = match timeout(state.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(TransportError::ConnectionClosed("closed before handshake".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = state.codec.decode(&data)?;
    let version = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version }) => version,
        _ => {
            send_error(conn, state, 0, 400, "expected Handshake").await?;
            return Err(ProtocolError::InvalidMessage("first message must be Handshake".into()).into());
        }
    };

    if version != PROTOCOL_VERSION {
        let message = format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}");
        send_error(conn, state, 0, 400, &message).await?;
        return Err(ProtocolError::InvalidMessage(message).into());
    }

    let player_id = state.next_player_id();
    let ack = SystemMessage::HandshakeAck {
        player_id,
        server_time: state.now_ms(),
    };
    send_envelope(conn, state, Envelope::system(0, state.now_ms(), ack)).await?;
    Ok(player_id)
}

/// One handshaken connection.
struct Session<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    state: &'a ServerState<C>,
    player_id: PlayerId,
    /// Handed to the room on create/join; the room pushes events through it.
    events: PlayerSender,
    seq: u64,
}

impl<C: Codec> Session<'_, C> {
    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    /// Dispatches one inbound frame. Returns `true` if the connection
    /// should close.
    async fn handle_frame(&mut self, data: &[u8]) -> Result<bool, MafiaError> {
        let envelope: Envelope = match self.state.codec.decode(data) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(player_id = %self.player_id, error = %e, "failed to decode envelope");
                return Ok(false);
            }
        };

        match envelope.payload {
            Payload::System(msg) => self.handle_system(msg).await,
            Payload::Game(data) => {
                self.handle_action(&data).await?;
                Ok(false)
            }
        }
    }

    async fn handle_system(&mut self, msg: SystemMessage) -> Result<bool, MafiaError> {
        let player_id = self.player_id;
        match msg {
            SystemMessage::Heartbeat { client_time } => {
                let ack = SystemMessage::HeartbeatAck {
                    client_time,
                    server_time: self.state.now_ms(),
                };
                self.send_system(ack).await?;
            }

            SystemMessage::CreateRoom { player_name } => {
                let Some(name) = self.checked_name(&player_name).await? else {
                    return Ok(false);
                };
                let result = {
                    let mut rooms = self.state.rooms.lock().await;
                    rooms.create_room(player_id, name, self.events.clone()).await
                };
                self.reply_joined(result).await?;
            }

            SystemMessage::JoinRoom {
                room_code,
                player_name,
            } => {
                let room_code = match RoomCode::parse(&room_code) {
                    Ok(code) => code,
                    Err(e) => {
                        self.send_error(400, &e.to_string()).await?;
                        return Ok(false);
                    }
                };
                let Some(name) = self.checked_name(&player_name).await? else {
                    return Ok(false);
                };
                let result = {
                    let mut rooms = self.state.rooms.lock().await;
                    rooms
                        .join_room(player_id, &room_code, name, self.events.clone())
                        .await
                };
                self.reply_joined(result).await?;
            }

            SystemMessage::LeaveRoom => {
                let result = self.state.rooms.lock().await.leave_room(player_id).await;
                match result {
                    Ok(room_code) => tracing::info!(%player_id, %room_code, "player left room"),
                    Err(e) => self.send_error(e.code(), &e.to_string()).await?,
                }
            }

            SystemMessage::Disconnect { reason } => {
                tracing::info!(%player_id, %reason, "client disconnected");
                return Ok(true);
            }

            other => {
                tracing::debug!(%player_id, message = ?other, "unexpected system message");
                self.send_error(400, "unexpected system message").await?;
            }
        }
        Ok(false)
    }

    /// Decodes a game payload and hands it to the player's room.
    async fn handle_action(&mut self, data: &[u8]) -> Result<(), MafiaError> {
        let action: ClientAction = match self.state.codec.decode(data) {
            Ok(action) => action,
            Err(e) => {
                tracing::debug!(player_id = %self.player_id, error = %e, "malformed action");
                return self.send_error(400, "malformed action").await;
            }
        };

        // Only hold the manager lock long enough to find the room.
        let handle = {
            let rooms = self.state.rooms.lock().await;
            rooms.handle_for(self.player_id).cloned()
        };
        let result = match handle {
            Ok(handle) => handle.act(self.player_id, action).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!(player_id = %self.player_id, error = %e, "action not routed");
            self.send_error(e.code(), &e.to_string()).await?;
        }
        Ok(())
    }

    /// Trims a display name, answering 400 if it is empty or too long.
    async fn checked_name(&mut self, raw: &str) -> Result<Option<String>, MafiaError> {
        let name = raw.trim();
        if name.is_empty() {
            self.send_error(400, "player name required").await?;
            return Ok(None);
        }
        if name.chars().count() > MAX_NAME_LEN {
            self.send_error(400, &format!("player name longer than {MAX_NAME_LEN} characters"))
                .await?;
            return Ok(None);
        }
        Ok(Some(name.to_string()))
    }

    async fn reply_joined(
        &mut self,
        result: Result<mafia_room::Joined, RoomError>,
    ) -> Result<(), MafiaError> {
        match result {
            Ok(joined) => {
                self.send_system(SystemMessage::RoomJoined {
                    room_code: joined.room_code,
                    player_id: self.player_id,
                    is_host: joined.is_host,
                })
                .await
            }
            Err(e) => {
                tracing::debug!(player_id = %self.player_id, error = %e, "room request refused");
                self.send_error(e.code(), &e.to_string()).await
            }
        }
    }

    async fn send_event(&mut self, event: &ServerEvent) -> Result<(), MafiaError> {
        let data = self.state.codec.encode(event)?;
        let envelope = Envelope::game(self.next_seq(), self.state.now_ms(), data);
        send_envelope(self.conn, self.state, envelope).await
    }

    async fn send_system(&mut self, msg: SystemMessage) -> Result<(), MafiaError> {
        let envelope = Envelope::system(self.next_seq(), self.state.now_ms(), msg);
        send_envelope(self.conn, self.state, envelope).await
    }

    async fn send_error(&mut self, code: u16, message: &str) -> Result<(), MafiaError> {
        let seq = self.next_seq();
        send_error(self.conn, self.state, seq, code, message).await
    }
}

async fn send_envelope<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    envelope: Envelope,
) -> Result<(), MafiaError> {
    let bytes = state.codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

async fn send_error<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    seq: u64,
    code: u16,
    message: &str,
) -> Result<(), MafiaError> {
    let error = SystemMessage::Error {
        code,
        message: message.to_string(),
    };
    send_envelope(conn, state, Envelope::system(seq, state.now_ms(), error)).await
}
