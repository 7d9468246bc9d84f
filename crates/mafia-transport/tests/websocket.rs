//! Integration tests for the WebSocket transport, over real sockets.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use mafia_transport::{Connection, Transport, WebSocketConnection, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on a free port and returns the server side of one client
    /// connection plus the client itself.
    async fn connected_pair() -> (WebSocketConnection, Client) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (conn, mut client) = connected_pair().await;
        assert!(conn.id().into_inner() > 0);
        assert!(conn.peer_addr().ip().is_loopback());

        conn.send(br#"{"hello":"client"}"#).await.expect("send should succeed");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "JSON goes out as a text frame");
        assert_eq!(msg.into_data().as_ref(), br#"{"hello":"client"}"#);

        client
            .send(Message::Text(r#"{"hello":"server"}"#.into()))
            .await
            .unwrap();
        let received = conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"hello":"server"}"#);

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_non_utf8_goes_out_binary() {
        let (conn, mut client) = connected_pair().await;
        conn.send(&[0xff, 0x00, 0x10]).await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending() {
        let (conn, mut client) = connected_pair().await;
        let conn = Arc::new(conn);

        let reader = Arc::clone(&conn);
        let pending = tokio::spawn(async move { reader.recv().await });

        // The reader holds the stream half; sending must still go through.
        tokio::time::timeout(Duration::from_secs(2), conn.send(b"ping"))
            .await
            .expect("send not blocked by pending recv")
            .unwrap();
        assert_eq!(client.next().await.unwrap().unwrap().into_data().as_ref(), b"ping");

        client.send(Message::Binary(b"pong".to_vec().into())).await.unwrap();
        let got = pending.await.unwrap().unwrap();
        assert_eq!(got.as_deref(), Some(&b"pong"[..]));
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = connected_pair().await;
        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }
}
