//! Integration tests for the server: handshake, room requests, and game
//! traffic over a real WebSocket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mafia::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server(config: ServerConfig) -> String {
    let server = MafiaServer::builder()
        .config(config)
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn default_server() -> String {
    start_server(ServerConfig::default()).await
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, payload: Payload) {
    let envelope = Envelope {
        seq: 0,
        timestamp: 0,
        payload,
    };
    let text = serde_json::to_string(&envelope).expect("encode");
    ws.send(Message::Text(text.into())).await.expect("send");
}

async fn send_system(ws: &mut ClientWs, msg: SystemMessage) {
    send(ws, Payload::System(msg)).await;
}

async fn send_action(ws: &mut ClientWs, action: &ClientAction) {
    let data = serde_json::to_vec(action).expect("encode action");
    send(ws, Payload::Game(data)).await;
}

/// Next envelope from the server, failing the test after two seconds.
async fn recv(ws: &mut ClientWs) -> Envelope {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for server")
        .expect("stream ended")
        .expect("recv");
    serde_json::from_slice(&msg.into_data()).expect("decode envelope")
}

async fn recv_system(ws: &mut ClientWs) -> SystemMessage {
    match recv(ws).await.payload {
        Payload::System(msg) => msg,
        other => panic!("expected system message, got {other:?}"),
    }
}

/// Skips frames until a game event matches, returning it.
async fn recv_event(ws: &mut ClientWs, wanted: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
    loop {
        if let Payload::Game(data) = recv(ws).await.payload {
            let event: ServerEvent = serde_json::from_slice(&data).expect("decode event");
            if wanted(&event) {
                return event;
            }
        }
    }
}

/// Handshakes and returns the assigned player id.
async fn handshake(ws: &mut ClientWs) -> PlayerId {
    send_system(
        ws,
        SystemMessage::Handshake {
            version: PROTOCOL_VERSION,
        },
    )
    .await;
    match recv_system(ws).await {
        SystemMessage::HandshakeAck { player_id, .. } => player_id,
        other => panic!("expected HandshakeAck, got {other:?}"),
    }
}

async fn create_room(ws: &mut ClientWs, name: &str) -> RoomCode {
    send_system(
        ws,
        SystemMessage::CreateRoom {
            player_name: name.into(),
        },
    )
    .await;
    match recv_system(ws).await {
        SystemMessage::RoomJoined {
            room_code, is_host, ..
        } => {
            assert!(is_host);
            room_code
        }
        other => panic!("expected RoomJoined, got {other:?}"),
    }
}

async fn join_room(ws: &mut ClientWs, code: &RoomCode, name: &str) -> SystemMessage {
    send_system(
        ws,
        SystemMessage::JoinRoom {
            room_code: code.as_str().to_lowercase(),
            player_name: name.into(),
        },
    )
    .await;
    recv_system(ws).await
}

fn expect_error(msg: SystemMessage, expected: u16) -> String {
    match msg {
        SystemMessage::Error { code, message } => {
            assert_eq!(code, expected, "unexpected error: {message}");
            message
        }
        other => panic!("expected Error {expected}, got {other:?}"),
    }
}

async fn expect_closed(ws: &mut ClientWs) {
    loop {
        let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("connection should close");
        match next {
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(_)) => continue,
        }
    }
}

// =========================================================================
// Handshake and connection lifecycle
// =========================================================================

#[tokio::test]
async fn test_handshake_assigns_distinct_player_ids() {
    let addr = default_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    let id_a = handshake(&mut a).await;
    let id_b = handshake(&mut b).await;
    assert_ne!(id_a, id_b);
}

#[tokio::test]
async fn test_handshake_version_mismatch() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;

    send_system(
        &mut ws,
        SystemMessage::Handshake {
            version: PROTOCOL_VERSION + 1,
        },
    )
    .await;
    let message = expect_error(recv_system(&mut ws).await, 400);
    assert!(message.contains("version mismatch"));
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_handshake_non_handshake_first_message() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;

    send_system(&mut ws, SystemMessage::Heartbeat { client_time: 1 }).await;
    let message = expect_error(recv_system(&mut ws).await, 400);
    assert!(message.contains("expected Handshake"));
}

#[tokio::test]
async fn test_heartbeat_response() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send_system(&mut ws, SystemMessage::Heartbeat { client_time: 1234 }).await;
    match recv_system(&mut ws).await {
        SystemMessage::HeartbeatAck { client_time, .. } => assert_eq!(client_time, 1234),
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disconnect_closes_connection() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send_system(
        &mut ws,
        SystemMessage::Disconnect {
            reason: "bye".into(),
        },
    )
    .await;
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_idle_connection_is_dropped() {
    let addr = start_server(ServerConfig {
        idle_timeout: Duration::from_millis(200),
        ..ServerConfig::default()
    })
    .await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    match recv_system(&mut ws).await {
        SystemMessage::Disconnect { reason } => assert_eq!(reason, "idle timeout"),
        other => panic!("expected Disconnect, got {other:?}"),
    }
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_invalid_envelope_ignored() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    ws.send(Message::Text("not json".into())).await.expect("send");

    // The connection survives and keeps answering.
    send_system(&mut ws, SystemMessage::Heartbeat { client_time: 7 }).await;
    assert!(matches!(
        recv_system(&mut ws).await,
        SystemMessage::HeartbeatAck { client_time: 7, .. }
    ));
}

// =========================================================================
// Room requests
// =========================================================================

#[tokio::test]
async fn test_join_room_not_found() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    let code = RoomCode::parse("ZZZZZZ").unwrap();
    expect_error(join_room(&mut ws, &code, "Ada").await, 404);
}

#[tokio::test]
async fn test_join_room_malformed_code() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send_system(
        &mut ws,
        SystemMessage::JoinRoom {
            room_code: "AB!".into(),
            player_name: "Ada".into(),
        },
    )
    .await;
    expect_error(recv_system(&mut ws).await, 400);
}

#[tokio::test]
async fn test_create_room_requires_name() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send_system(
        &mut ws,
        SystemMessage::CreateRoom {
            player_name: "   ".into(),
        },
    )
    .await;
    let message = expect_error(recv_system(&mut ws).await, 400);
    assert!(message.contains("name"));
}

#[tokio::test]
async fn test_create_room_twice_rejected() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;
    create_room(&mut ws, "Ada").await;

    send_system(
        &mut ws,
        SystemMessage::CreateRoom {
            player_name: "Ada".into(),
        },
    )
    .await;
    // The room's own RoomUpdate may arrive first.
    loop {
        if let Payload::System(msg) = recv(&mut ws).await.payload {
            expect_error(msg, 412);
            break;
        }
    }
}

#[tokio::test]
async fn test_game_message_not_in_room() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send_action(&mut ws, &ClientAction::StartGame).await;
    let message = expect_error(recv_system(&mut ws).await, 404);
    assert!(message.contains("not in a room"));
}

#[tokio::test]
async fn test_malformed_action_rejected() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send(&mut ws, Payload::Game(b"{\"type\":\"Dance\"}".to_vec())).await;
    expect_error(recv_system(&mut ws).await, 400);
}

#[tokio::test]
async fn test_leave_room_without_room() {
    let addr = default_server().await;
    let mut ws = connect(&addr).await;
    handshake(&mut ws).await;

    send_system(&mut ws, SystemMessage::LeaveRoom).await;
    expect_error(recv_system(&mut ws).await, 404);
}

// =========================================================================
// Playing
// =========================================================================

#[tokio::test]
async fn test_create_join_start_delivers_roles() {
    let addr = default_server().await;

    let mut host = connect(&addr).await;
    handshake(&mut host).await;
    let code = create_room(&mut host, "Ada").await;
    recv_event(&mut host, |e| matches!(e, ServerEvent::RoomUpdate(_))).await;

    let mut guests = Vec::new();
    for name in ["Bo", "Cy", "Di", "Ed", "Flo"] {
        let mut ws = connect(&addr).await;
        let player_id = handshake(&mut ws).await;
        match join_room(&mut ws, &code, name).await {
            SystemMessage::RoomJoined {
                room_code,
                player_id: joined_as,
                is_host,
            } => {
                assert_eq!(room_code, code);
                assert_eq!(joined_as, player_id);
                assert!(!is_host);
            }
            other => panic!("expected RoomJoined, got {other:?}"),
        }
        let update = recv_event(&mut ws, |e| matches!(e, ServerEvent::RoomUpdate(_))).await;
        if let ServerEvent::RoomUpdate(snapshot) = update {
            assert_eq!(snapshot.room_code, code);
            assert!(snapshot.players.iter().any(|p| p.id == player_id));
        }
        guests.push(ws);
    }

    send_action(&mut host, &ClientAction::StartGame).await;

    let mut roles = Vec::new();
    for ws in std::iter::once(&mut host).chain(guests.iter_mut()) {
        match recv_event(ws, |e| matches!(e, ServerEvent::RoleAssigned { .. })).await {
            ServerEvent::RoleAssigned { role, teammates } => {
                if role == Role::Mafia {
                    assert_eq!(teammates.len(), 1);
                } else {
                    assert!(teammates.is_empty());
                }
                roles.push(role);
            }
            _ => unreachable!(),
        }
        match recv_event(ws, |e| matches!(e, ServerEvent::GameStarted(_))).await {
            ServerEvent::GameStarted(snapshot) => {
                assert_eq!(snapshot.phase, Phase::Night);
                assert_eq!(snapshot.players.len(), 6);
            }
            _ => unreachable!(),
        }
    }

    let count = |role: Role| roles.iter().filter(|r| **r == role).count();
    assert_eq!(count(Role::Mafia), 2);
    assert_eq!(count(Role::Detective), 1);
    assert_eq!(count(Role::Doctor), 1);
    assert_eq!(count(Role::Villager), 2);
}

#[tokio::test]
async fn test_non_host_start_is_rejected() {
    let addr = default_server().await;

    let mut host = connect(&addr).await;
    handshake(&mut host).await;
    let code = create_room(&mut host, "Ada").await;

    let mut guest = connect(&addr).await;
    handshake(&mut guest).await;
    assert!(matches!(
        join_room(&mut guest, &code, "Bo").await,
        SystemMessage::RoomJoined { .. }
    ));

    send_action(&mut guest, &ClientAction::StartGame).await;
    let rejected =
        recv_event(&mut guest, |e| matches!(e, ServerEvent::ActionRejected { .. })).await;
    assert!(matches!(rejected, ServerEvent::ActionRejected { .. }));
}

#[tokio::test]
async fn test_dropped_connection_leaves_room() {
    let addr = default_server().await;

    let mut host = connect(&addr).await;
    handshake(&mut host).await;
    let code = create_room(&mut host, "Ada").await;

    let mut guest = connect(&addr).await;
    let guest_id = handshake(&mut guest).await;
    join_room(&mut guest, &code, "Bo").await;
    drop(guest);

    match recv_event(&mut host, |e| matches!(e, ServerEvent::PlayerLeft { .. })).await {
        ServerEvent::PlayerLeft { player_id, name } => {
            assert_eq!(player_id, guest_id);
            assert_eq!(name, "Bo");
        }
        _ => unreachable!(),
    }
}
