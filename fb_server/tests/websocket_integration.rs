//! WebSocket integration tests for the snapshot feed.
//!
//! Runs the router on a real listener and connects with a WebSocket client.

use axum::body::Body;
use axum::http::Request;
use family_bingo::{GameCode, GameService, PlayerId};
use fb_server::api::{AppState, create_router};
use futures_util::StreamExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tower::ServiceExt;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve the API for `service` on an ephemeral port.
async fn spawn_server(service: GameService) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(AppState::new(service));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

async fn connect(addr: SocketAddr, code: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{addr}/ws/{code}"))
        .await
        .expect("Failed to connect to WebSocket");
    ws
}

/// Next JSON message, or `None` once the server closed the connection.
async fn next_json(ws: &mut Ws) -> Option<Value> {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for a message")?;

        match msg {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

async fn created_game(service: &GameService) -> GameCode {
    service.create_game(&PlayerId::new("host")).await.unwrap()
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_plain_get_is_not_upgraded() {
    let app = create_router(AppState::new(GameService::in_memory()));

    let request = Request::builder()
        .uri("/ws/ABCD") // No upgrade headers
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert!(
        response.status().is_client_error(),
        "Plain GET should be rejected, got: {}",
        response.status()
    );
}

#[tokio::test]
async fn test_unknown_game_sends_not_found_and_closes() {
    let addr = spawn_server(GameService::in_memory()).await;
    let mut ws = connect(addr, "ZZZZ").await;

    let msg = next_json(&mut ws).await.unwrap();
    assert_eq!(msg["type"], "not_found");
    assert!(next_json(&mut ws).await.is_none());
}

// ============================================================================
// Snapshot Feed Tests
// ============================================================================

#[tokio::test]
async fn test_initial_snapshot_then_each_commit() {
    let service = GameService::in_memory();
    let code = created_game(&service).await;
    let addr = spawn_server(service.clone()).await;

    let mut ws = connect(addr, code.as_str()).await;

    let initial = next_json(&mut ws).await.unwrap();
    assert_eq!(initial["type"], "snapshot");
    assert_eq!(initial["game"]["id"], code.as_str());
    assert_eq!(initial["game"]["status"], "waiting");
    let v1 = initial["version"].as_u64().unwrap();

    service
        .join_game(&code, &PlayerId::new("p1"), "Ann")
        .await
        .unwrap();
    let joined = next_json(&mut ws).await.unwrap();
    assert_eq!(joined["game"]["players"].as_array().unwrap().len(), 1);
    let v2 = joined["version"].as_u64().unwrap();
    assert!(v2 > v1);

    let first = service.start_game(&code).await.unwrap().unwrap();
    let started = next_json(&mut ws).await.unwrap();
    assert_eq!(started["game"]["status"], "playing");
    assert_eq!(started["game"]["currentNumber"], first);
    assert!(started["version"].as_u64().unwrap() > v2);
}

#[tokio::test]
async fn test_lowercase_code_subscribes_to_same_game() {
    let service = GameService::in_memory();
    let code = created_game(&service).await;
    let addr = spawn_server(service).await;

    let mut ws = connect(addr, &code.as_str().to_lowercase()).await;
    let initial = next_json(&mut ws).await.unwrap();
    assert_eq!(initial["game"]["id"], code.as_str());
}

#[tokio::test]
async fn test_every_subscriber_gets_updates() {
    let service = GameService::in_memory();
    let code = created_game(&service).await;
    let addr = spawn_server(service.clone()).await;

    let mut a = connect(addr, code.as_str()).await;
    let mut b = connect(addr, code.as_str()).await;
    next_json(&mut a).await.unwrap();
    next_json(&mut b).await.unwrap();

    service.end_game(&code).await.unwrap();

    for ws in [&mut a, &mut b] {
        let msg = next_json(ws).await.unwrap();
        assert_eq!(msg["game"]["status"], "ended");
    }
}

#[tokio::test]
async fn test_discarded_game_sends_not_found() {
    let service = GameService::in_memory();
    let code = created_game(&service).await;
    let addr = spawn_server(service.clone()).await;

    let mut ws = connect(addr, code.as_str()).await;
    next_json(&mut ws).await.unwrap();

    assert!(service.discard_game(&code).await.unwrap());

    let msg = next_json(&mut ws).await.unwrap();
    assert_eq!(msg["type"], "not_found");
    assert!(next_json(&mut ws).await.is_none());
}

#[tokio::test]
async fn test_disconnect_releases_subscription() {
    let service = GameService::in_memory();
    let code = created_game(&service).await;
    let addr = spawn_server(service.clone()).await;

    let mut ws = connect(addr, code.as_str()).await;
    next_json(&mut ws).await.unwrap();
    assert_eq!(service.hub().listeners(&code), 1);

    ws.close(None).await.unwrap();
    drop(ws);

    // The server notices the close asynchronously.
    for _ in 0..100 {
        if service.hub().listeners(&code) == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("subscription still registered after disconnect");
}
