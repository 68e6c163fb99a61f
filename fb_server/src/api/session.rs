//! Anonymous session identities.
//!
//! There are no accounts. A client asks for a session token once, keeps it
//! for as long as it wants to be the same player (or host), and sends it on
//! every mutating request in the `x-session-token` header.
//!
//! The token is a bearer secret and never appears in a game record. Records
//! store the public id derived from it with [`player_id_for`], and snapshots
//! are public, so the derivation has to be one-way.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::post, middleware, extract::Extension};
//! use family_bingo::PlayerId;
//! use fb_server::api::session::session_middleware;
//!
//! async fn whoami(Extension(caller): Extension<PlayerId>) -> String {
//!     caller.to_string()
//! }
//!
//! let protected: Router = Router::new()
//!     .route("/whoami", post(whoami))
//!     .layer(middleware::from_fn(session_middleware));
//! # let _ = protected;
//! ```

use axum::{
    Json,
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use family_bingo::PlayerId;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::metrics;

/// Header carrying the caller's session token
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Longest token accepted
pub const MAX_TOKEN_LEN: usize = 64;

/// Separates session ids from any other use of the same hash.
const PLAYER_ID_DOMAIN: &[u8] = b"family-bingo/player-id/v1:";

/// Public player id for a session token: the first 16 bytes of
/// `SHA-256(domain || token)`, hex encoded.
pub fn player_id_for(token: &str) -> PlayerId {
    let digest = Sha256::new()
        .chain_update(PLAYER_ID_DOMAIN)
        .chain_update(token.as_bytes())
        .finalize();
    PlayerId::new(hex::encode(&digest[..16]))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
}

/// Issue a fresh session token.
///
/// # Response
///
/// Returns `201 Created`:
/// ```json
/// { "token": "3f0c1b8e9d2a4c7f8e6b5a4d3c2b1a09" }
/// ```
pub async fn create_session() -> (StatusCode, Json<SessionResponse>) {
    let token = Uuid::new_v4().simple().to_string();
    metrics::session_issued();
    log::debug!("Issued session for player {}", player_id_for(&token));

    (StatusCode::CREATED, Json(SessionResponse { token }))
}

/// Read the session header and resolve the caller's public identity.
pub fn caller_from_headers(headers: &HeaderMap) -> Option<PlayerId> {
    headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.len() <= MAX_TOKEN_LEN)
        .map(player_id_for)
}

/// Middleware that requires a session token and injects the caller's `PlayerId`.
///
/// # Behavior
///
/// - **Token present**: Injects `PlayerId` into request extensions → Calls next handler
/// - **Missing, empty or oversized token**: Returns `401 Unauthorized`
pub async fn session_middleware(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let Some(caller) = caller_from_headers(request.headers()) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
