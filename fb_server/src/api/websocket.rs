//! WebSocket push of game snapshots.
//!
//! A connection to `GET /ws/{code}` is a read-only feed: the server sends
//! the current state of the game right away and then every committed
//! version, oldest first. Nothing the client sends is interpreted; all
//! actions go through the HTTP API.
//!
//! # Server Messages
//!
//! ```json
//! {"type": "snapshot", "version": 7, "game": { "id": "K7Q2", "status": "playing", ... }}
//! {"type": "not_found"}
//! ```
//!
//! After `not_found` (unknown code, or the host discarded the game) the
//! server closes the connection.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/K7Q2');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === 'snapshot') {
//!     render(data.game);
//!   }
//! };
//! ```

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use family_bingo::{Game, GameCode, GameUpdate};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use serde::Serialize;

use super::AppState;
use crate::metrics;

/// Messages pushed to the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    Snapshot { version: u64, game: &'a Game },
    NotFound,
}

impl<'a> ServerMessage<'a> {
    pub fn from_update(update: &'a GameUpdate) -> Self {
        match update {
            GameUpdate::Snapshot { version, game } => ServerMessage::Snapshot {
                version: *version,
                game,
            },
            GameUpdate::NotFound => ServerMessage::NotFound,
        }
    }
}

/// Upgrade to a WebSocket that streams snapshots of one game.
///
/// # Path Parameters
///
/// - `code`: Game code (case-insensitive)
///
/// # Response
///
/// `101 Switching Protocols` on success, `404 Not Found` for a malformed code.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let code = match GameCode::parse(&code) {
        Ok(code) => code,
        Err(e) => return (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, code, state))
}

/// Pump subscription updates into the socket until either side goes away.
async fn handle_socket(socket: WebSocket, code: GameCode, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let mut subscription = match state.service.subscribe(&code).await {
        Ok(subscription) => subscription,
        Err(e) => {
            error!("Failed to subscribe to game {}: {}", code, e);
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    info!("WebSocket connected: game={}", code);
    metrics::feed_opened();
    metrics::feeds_open(state.service.hub().subscriber_count());

    loop {
        tokio::select! {
            update = subscription.recv() => {
                let Some(update) = update else { break };

                let json = match serde_json::to_string(&ServerMessage::from_update(&update)) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize update for game {}: {}", code, e);
                        continue;
                    }
                };

                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
                metrics::feed_message_pushed();

                if matches!(update, GameUpdate::NotFound) {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!("WebSocket error on game {}: {}", code, e);
                    break;
                }
                // Read-only feed; pings are answered by axum.
                Some(Ok(_)) => {}
            }
        }
    }

    drop(subscription);
    metrics::feeds_open(state.service.hub().subscriber_count());
    info!("WebSocket disconnected: game={}", code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use family_bingo::PlayerId;
    use std::sync::Arc;

    #[test]
    fn test_snapshot_message_shape() {
        let game = Game::new(GameCode::parse("ABCD").unwrap(), PlayerId::new("host"));
        let update = GameUpdate::Snapshot {
            version: 3,
            game: Arc::new(game),
        };

        let value = serde_json::to_value(ServerMessage::from_update(&update)).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["version"], 3);
        assert_eq!(value["game"]["id"], "ABCD");
        assert_eq!(value["game"]["status"], "waiting");
    }

    #[test]
    fn test_not_found_message_shape() {
        let value = serde_json::to_value(ServerMessage::from_update(&GameUpdate::NotFound)).unwrap();
        assert_eq!(value, serde_json::json!({"type": "not_found"}));
    }
}
