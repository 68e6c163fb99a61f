//! HTTP/WebSocket API for the bingo server.
//!
//! Handlers are thin wrappers over [`GameService`]; every mutation is one
//! atomic read-modify-write on the game record.
//!
//! # Routes
//!
//! ## Public
//! - `GET /health` - Server health status
//! - `POST /api/v1/session` - Issue a session token
//! - `GET /api/v1/games/{code}` - Current snapshot
//! - `GET /api/v1/games/{code}/leaderboard` - Standings
//! - `GET /api/v1/games/{code}/commentary` - Commentary line
//! - `GET /ws/{code}` - Snapshot feed
//!
//! ## Session token required (`x-session-token`)
//! - `POST /api/v1/games` - Create a game, caller becomes host
//! - `POST /api/v1/games/{code}/join` - Join with a name
//! - `POST /api/v1/games/{code}/start` - Start (host)
//! - `POST /api/v1/games/{code}/call` - Call next number (host)
//! - `POST /api/v1/games/{code}/end` - End (host)
//! - `POST /api/v1/games/{code}/discard` - Delete the record (host)
//! - `POST /api/v1/games/{code}/claim` - Claim the win
//! - `POST /api/v1/games/{code}/players/me/mark` - Paid manual daub
//! - `POST /api/v1/games/{code}/players/me/cards` - Buy a card
//! - `POST /api/v1/games/{code}/players/me/coins` - Coin top-up
//!
//! ```rust,no_run
//! use fb_server::api::{create_router, AppState};
//! use family_bingo::GameService;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(GameService::in_memory());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:6969").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! CORS is permissive: family devices connect from anywhere on the local network.

pub mod games;
pub mod request_id;
pub mod session;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use family_bingo::{Database, GameService, commentary::CommentaryProvider};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;

use crate::metrics;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub service: GameService,
    /// Present when games are stored in PostgreSQL; checked by `/health`
    pub database: Option<Arc<Database>>,
    /// Auto-calling period applied to games started through the API
    pub auto_call: Option<Duration>,
    /// Text generator behind `/commentary`
    pub commentary: Option<Arc<dyn CommentaryProvider>>,
}

impl AppState {
    /// State with manual calling, no database and no commentary provider.
    pub fn new(service: GameService) -> Self {
        Self {
            service,
            database: None,
            auto_call: None,
            commentary: None,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    // Root routes (not versioned)
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/{code}", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/session", post(session::create_session))
        .route("/games/{code}", get(games::get_game))
        .route("/games/{code}/leaderboard", get(games::leaderboard))
        .route("/games/{code}/commentary", get(games::commentary));

    let protected_routes = Router::new()
        .route("/games", post(games::create_game))
        .route("/games/{code}/discard", post(games::discard_game))
        .route("/games/{code}/join", post(games::join_game))
        .route("/games/{code}/start", post(games::start_game))
        .route("/games/{code}/call", post(games::call_number))
        .route("/games/{code}/end", post(games::end_game))
        .route("/games/{code}/claim", post(games::claim_win))
        .route("/games/{code}/players/me/mark", post(games::manual_mark))
        .route("/games/{code}/players/me/cards", post(games::buy_card))
        .route("/games/{code}/players/me/coins", post(games::add_coins))
        .layer(axum::middleware::from_fn(session::session_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Response
///
/// Returns `200 OK` if the store answers, or `503 Service Unavailable`.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","database":"memory","games":{"healthy":true,"active_count":2},"subscribers":5,...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(()) => json!(true),
            Err(e) => {
                log::warn!("Database health check failed: {}", e);
                json!(false)
            }
        },
        None => json!("memory"),
    };
    let db_healthy = database != json!(false);

    let game_count = state.service.game_count().await;
    let games_healthy = game_count.is_ok();
    let active_count = game_count.unwrap_or(0);
    metrics::games_stored(active_count);

    let overall_healthy = db_healthy && games_healthy;
    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "games": {
            "healthy": games_healthy,
            "active_count": active_count
        },
        "subscribers": state.service.hub().subscriber_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
