//! WebSocket Protocol Integration Tests
//!
//! Starts the server in-process on an ephemeral port and talks MessagePack
//! to it over a real WebSocket connection.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gitroute_core::endpoint::EndpointRegistry;
use gitroute_core::producer::{GitBody, GitOperation};
use gitroute_core::server::{serve, AppContext, ServerMessage, PROTOCOL_VERSION};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

const TIMEOUT_SECS: u64 = 10;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    url: String,
    state_dir: tempfile::TempDir,
}

async fn start_server() -> TestServer {
    let state_dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let ctx = AppContext::new(
        EndpointRegistry::default(),
        EndpointRegistry::state_path(state_dir.path()),
    );
    tokio::spawn(async move {
        let _ = serve(listener, ctx).await;
    });
    TestServer {
        url: format!("ws://{}/ws", addr),
        state_dir,
    }
}

async fn connect(server: &TestServer) -> Client {
    let (mut ws, _) = connect_async(&server.url).await.unwrap();
    match recv(&mut ws).await {
        ServerMessage::Hello {
            version,
            capabilities,
        } => {
            assert_eq!(version, PROTOCOL_VERSION);
            assert!(capabilities.unwrap().contains(&"git_status".to_string()));
        }
        other => panic!("expected hello, got {:?}", other),
    }
    ws
}

async fn send(ws: &mut Client, request: Value) {
    let bytes = rmp_serde::to_vec_named(&request).unwrap();
    ws.send(Message::Binary(bytes)).await.unwrap();
}

async fn recv(ws: &mut Client) -> ServerMessage {
    loop {
        let frame = timeout(Duration::from_secs(TIMEOUT_SECS), ws.next())
            .await
            .expect("timed out waiting for server message")
            .expect("connection closed")
            .expect("websocket error");
        match frame {
            Message::Binary(data) => return rmp_serde::from_slice(&data).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

#[tokio::test]
async fn ping_pong_and_text_frames_ignored() {
    let server = start_server().await;
    let mut ws = connect(&server).await;

    ws.send(Message::Text("{\"type\":\"ping\"}".to_string()))
        .await
        .unwrap();
    send(&mut ws, json!({ "type": "ping" })).await;

    assert!(matches!(recv(&mut ws).await, ServerMessage::Pong));
}

#[tokio::test]
async fn malformed_message_reports_error_and_keeps_connection() {
    let server = start_server().await;
    let mut ws = connect(&server).await;

    send(&mut ws, json!({ "type": "no_such_message" })).await;
    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "message_error"),
        other => panic!("expected error, got {:?}", other),
    }

    send(&mut ws, json!({ "type": "ping" })).await;
    assert!(matches!(recv(&mut ws).await, ServerMessage::Pong));
}

#[tokio::test]
async fn registry_and_exchange_flow() {
    let server = start_server().await;
    let mut ws = connect(&server).await;
    let repo_parent = tempfile::tempdir().unwrap();
    let repo_path = repo_parent.path().join("repo");

    send(
        &mut ws,
        json!({
            "type": "register_endpoint",
            "name": "work",
            "endpoint": {
                "local_path": repo_path.display().to_string(),
                "username": "bob",
                "password": "secret",
            },
        }),
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::EndpointRegistered { name } => assert_eq!(name, "work"),
        other => panic!("expected endpoint_registered, got {:?}", other),
    }

    send(&mut ws, json!({ "type": "list_endpoints" })).await;
    match recv(&mut ws).await {
        ServerMessage::Endpoints { items } => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].name, "work");
            assert_eq!(items[0].endpoint.username.as_deref(), Some("bob"));
            assert_eq!(items[0].endpoint.password, None);
        }
        other => panic!("expected endpoints, got {:?}", other),
    }

    send(
        &mut ws,
        json!({
            "id": "req-1",
            "type": "exchange",
            "endpoint": "work",
            "headers": { "GitOperation": "init" },
        }),
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::ExchangeResult {
            exchange_id,
            endpoint,
            operation,
            ok,
            ..
        } => {
            assert_eq!(exchange_id, "req-1");
            assert_eq!(endpoint, "work");
            assert_eq!(operation, Some(GitOperation::Init));
            assert!(ok);
        }
        other => panic!("expected exchange_result, got {:?}", other),
    }
    assert!(repo_path.join(".git").is_dir());

    send(
        &mut ws,
        json!({
            "type": "exchange",
            "endpoint": "work",
            "headers": { "GitOperation": "status" },
        }),
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::ExchangeResult {
            exchange_id,
            ok,
            body,
            ..
        } => {
            assert!(ok);
            assert_eq!(exchange_id.len(), 36);
            match body {
                Some(GitBody::Status(status)) => assert!(status.clean),
                other => panic!("expected status body, got {:?}", other),
            }
        }
        other => panic!("expected exchange_result, got {:?}", other),
    }

    send(
        &mut ws,
        json!({ "type": "remove_endpoint", "name": "work" }),
    )
    .await;
    assert!(matches!(
        recv(&mut ws).await,
        ServerMessage::EndpointRemoved { .. }
    ));

    // The debounced saver persists the registry shortly after changes.
    let state_path = EndpointRegistry::state_path(server.state_dir.path());
    let mut persisted = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if state_path.exists() {
            persisted = true;
            break;
        }
    }
    assert!(persisted);
    let raw = std::fs::read_to_string(&state_path).unwrap();
    assert!(!raw.contains("secret"));
}

#[tokio::test]
async fn exchange_errors_are_replies_not_disconnects() {
    let server = start_server().await;
    let mut ws = connect(&server).await;
    let dir = tempfile::tempdir().unwrap();

    send(
        &mut ws,
        json!({ "type": "exchange", "endpoint": "missing", "headers": {} }),
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "endpoint_not_found"),
        other => panic!("expected error, got {:?}", other),
    }

    let uri = format!("git://?localPath={}&operation=log", dir.path().display());
    send(&mut ws, json!({ "type": "exchange", "endpoint": uri })).await;
    match recv(&mut ws).await {
        ServerMessage::ExchangeResult {
            endpoint,
            operation,
            ok,
            error_code,
            message,
            ..
        } => {
            assert_eq!(endpoint, "<inline>");
            assert_eq!(operation, Some(GitOperation::Log));
            assert!(!ok);
            assert_eq!(error_code.as_deref(), Some("not_a_git_repo"));
            assert!(message.unwrap().starts_with("log failed"));
        }
        other => panic!("expected exchange_result, got {:?}", other),
    }

    send(
        &mut ws,
        json!({ "type": "remove_endpoint", "name": "missing" }),
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "endpoint_not_found"),
        other => panic!("expected error, got {:?}", other),
    }

    send(&mut ws, json!({ "type": "ping" })).await;
    assert!(matches!(recv(&mut ws).await, ServerMessage::Pong));
}
