// Integration tests for the WebSocket echo transport.
// A real tokio-tungstenite client exercises the hand-rolled handshake
// and frame codec end to end.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use text_relay::config::ServerConfig;
use text_relay::core::server::{RelayServer, ShutdownHandle};
use text_relay::handlers::handle_ws_client;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_relay() -> (SocketAddr, ShutdownHandle, JoinHandle<()>) {
    let config = ServerConfig {
        ws_port: 0,
        chat_port: 0,
        ..ServerConfig::default()
    };
    let server = RelayServer::bind(config).await.expect("failed to bind relay");
    let ws_addr = server.ws_addr().expect("no websocket address");
    let shutdown = server.shutdown_handle();
    let handle = tokio::spawn(async move {
        server.run().await.expect("relay run failed");
    });
    (ws_addr, shutdown, handle)
}

type WsClient = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

async fn echo_round_trip(ws_stream: &mut WsClient, text: &str) {
    ws_stream
        .send(Message::Text(text.to_string()))
        .await
        .expect("send failed");

    let reply = timeout(RECV_TIMEOUT, ws_stream.next())
        .await
        .expect("timed out waiting for the echo")
        .expect("connection closed unexpectedly")
        .expect("read failed");
    assert_eq!(
        reply.into_text().expect("expected a text frame"),
        format!("echo: {}", text)
    );
}

#[tokio::test]
async fn test_upgrade_and_echo() {
    let (ws_addr, _shutdown, _server) = start_relay().await;

    let (mut ws_stream, response) = connect_async(format!("ws://{}/ws", ws_addr))
        .await
        .expect("upgrade failed");
    assert_eq!(response.status().as_u16(), 101);

    echo_round_trip(&mut ws_stream, "hello websocket").await;
    echo_round_trip(&mut ws_stream, "second message").await;
}

#[tokio::test]
async fn test_echo_uses_extended_length_frames() {
    let (ws_addr, _shutdown, _server) = start_relay().await;

    let (mut ws_stream, _) = connect_async(format!("ws://{}/ws", ws_addr))
        .await
        .expect("upgrade failed");

    // Well past the 125-byte inline limit on both directions
    let text = "0123456789".repeat(200);
    echo_round_trip(&mut ws_stream, &text).await;
}

#[tokio::test]
async fn test_unknown_path_is_rejected() {
    let (ws_addr, _shutdown, _server) = start_relay().await;

    let result = connect_async(format!("ws://{}/definitely-not-ws", ws_addr)).await;
    assert!(result.is_err(), "expected the upgrade to be refused");
}

#[tokio::test]
async fn test_plain_http_request_gets_400() {
    let (ws_addr, _shutdown, _server) = start_relay().await;

    let mut stream = TcpStream::connect(ws_addr).await.expect("connect failed");
    stream
        .write_all(b"GET /ws HTTP/1.1\r\nHost: test\r\n\r\n")
        .await
        .expect("send failed");

    let mut response = String::new();
    timeout(RECV_TIMEOUT, stream.read_to_string(&mut response))
        .await
        .expect("timed out waiting for the response")
        .expect("read failed");

    assert!(
        response.starts_with("HTTP/1.1 400 Bad Request\r\n"),
        "unexpected response: {}",
        response
    );
}

#[tokio::test]
async fn test_missing_websocket_key_gets_400() {
    let (ws_addr, _shutdown, _server) = start_relay().await;

    let mut stream = TcpStream::connect(ws_addr).await.expect("connect failed");
    stream
        .write_all(b"GET /ws HTTP/1.1\r\nHost: test\r\nUpgrade: websocket\r\n\r\n")
        .await
        .expect("send failed");

    let mut response = String::new();
    timeout(RECV_TIMEOUT, stream.read_to_string(&mut response))
        .await
        .expect("timed out waiting for the response")
        .expect("read failed");

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(response.contains("Sec-WebSocket-Key"));
}

// The handler future crosses threads via tokio::spawn, so it must stay
// Send; this fails to compile if a select arm ever leaks a lock guard
#[tokio::test]
async fn test_websocket_handler_future_is_send() {
    fn assert_send<F: std::future::Future + Send>(future: F) -> F {
        future
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("no local address");
    let client = TcpStream::connect(addr).await.expect("connect failed");
    let (stream, peer) = listener.accept().await.expect("accept failed");
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let handler = tokio::spawn(assert_send(handle_ws_client(
        stream,
        peer,
        "/ws".to_string(),
        shutdown_rx,
    )));

    // Peer disconnect before the handshake runs the handler's error path
    drop(client);
    timeout(RECV_TIMEOUT, handler)
        .await
        .expect("handler did not stop in time")
        .expect("handler panicked");
}

#[tokio::test]
async fn test_shutdown_closes_websocket_clients() {
    let (ws_addr, shutdown, server) = start_relay().await;

    let (mut ws_stream, _) = connect_async(format!("ws://{}/ws", ws_addr))
        .await
        .expect("upgrade failed");
    echo_round_trip(&mut ws_stream, "sync").await;

    shutdown.trigger();
    timeout(RECV_TIMEOUT, server)
        .await
        .expect("server did not stop in time")
        .expect("server task panicked");

    // The connection drops without a closing handshake (control frames
    // are out of scope), which the client observes as an abrupt end
    let end = timeout(RECV_TIMEOUT, ws_stream.next())
        .await
        .expect("timed out waiting for the connection to end");
    assert!(
        matches!(end, None | Some(Err(_))),
        "expected closure, got {:?}",
        end
    );

    assert!(TcpStream::connect(ws_addr).await.is_err());
}
