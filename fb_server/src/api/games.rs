//! Game API handlers.
//!
//! This module provides HTTP REST endpoints for bingo games:
//! - Creating a game and reading its current snapshot
//! - Joining, claiming a win and the paid player actions
//! - Host controls: start, call the next number, end, discard
//! - Host standings and optional commentary
//!
//! Every mutating endpoint requires the `x-session-token` header. Host
//! controls additionally require the caller to be the game's host.
//!
//! # Examples
//!
//! Create a game:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/games -H "x-session-token: TOKEN"
//! ```
//!
//! Join it:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/games/K7Q2/join \
//!   -H "x-session-token: TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Grandma"}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use family_bingo::{
    Game, GameCode, GameError, HostSession, LeaderboardEntry, PlayerId, WinOutcome,
    game::letter_for,
    service::{JoinOutcome, MarkOutcome},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{AppState, request_id::RequestId};
use crate::metrics;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct CreateGameResponse {
    pub code: GameCode,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub outcome: JoinOutcome,
}

#[derive(Debug, Serialize)]
pub struct CallResponse {
    /// Number that was called, `None` when the game did not advance
    pub number: Option<u8>,
    /// Column letter of `number`
    pub letter: Option<char>,
}

impl CallResponse {
    fn new(number: Option<u8>) -> Self {
        Self {
            number,
            letter: number.and_then(letter_for),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub card_index: usize,
    pub number: u8,
}

#[derive(Debug, Serialize)]
pub struct BuyCardResponse {
    pub purchased: bool,
}

#[derive(Debug, Serialize)]
pub struct CoinsResponse {
    pub coins: u32,
}

#[derive(Debug, Serialize)]
pub struct CommentaryResponse {
    pub commentary: String,
}

/// HTTP status for a game error.
pub fn status_for(err: &GameError) -> StatusCode {
    match err {
        GameError::InvalidCode(_)
        | GameError::GameNotFound(_)
        | GameError::PlayerNotFound { .. } => StatusCode::NOT_FOUND,
        GameError::NotHost => StatusCode::FORBIDDEN,
        GameError::InvalidName(_)
        | GameError::CardNotFound(_)
        | GameError::NumberNotOnCard(_)
        | GameError::Invariant(_) => StatusCode::BAD_REQUEST,
        GameError::WrongStatus { .. }
        | GameError::InsufficientCoins { .. }
        | GameError::AlreadyMarked(_)
        | GameError::NoBingo => StatusCode::CONFLICT,
        GameError::CollaboratorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GameError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a game error into a sanitized JSON error response.
pub fn error_response(err: GameError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        log::error!("Request failed: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

fn parse_code(raw: &str) -> ApiResult<GameCode> {
    GameCode::parse(raw).map_err(|e| error_response(e.into()))
}

/// Create a new game hosted by the caller.
///
/// # Response
///
/// Returns `201 Created`:
/// ```json
/// { "code": "K7Q2" }
/// ```
pub async fn create_game(
    State(state): State<AppState>,
    Extension(caller): Extension<PlayerId>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<(StatusCode, Json<CreateGameResponse>)> {
    let code = state
        .service
        .create_game(&caller)
        .await
        .map_err(error_response)?;

    metrics::game_created();
    info!("[{}] {} created game {}", request_id.as_str(), caller, code);

    Ok((StatusCode::CREATED, Json(CreateGameResponse { code })))
}

/// Current snapshot of a game. Public, like a lobby screen.
///
/// # Errors
///
/// - `404 Not Found`: Unknown or malformed game code
pub async fn get_game(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Game>> {
    let code = parse_code(&code)?;
    let game = state.service.get_game(&code).await.map_err(error_response)?;
    Ok(Json(game))
}

/// Join a waiting game with a display name.
///
/// Joining again with the same session token is a no-op that reports
/// `already_joined`.
///
/// # Errors
///
/// - `400 Bad Request`: Name empty or longer than 20 characters
/// - `404 Not Found`: Game doesn't exist
/// - `409 Conflict`: Game already started
pub async fn join_game(
    State(state): State<AppState>,
    Extension(caller): Extension<PlayerId>,
    Path(code): Path<String>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<Json<JoinResponse>> {
    let code = parse_code(&code)?;
    let outcome = state
        .service
        .join_game(&code, &caller, &request.name)
        .await
        .map_err(error_response)?;

    Ok(Json(JoinResponse { outcome }))
}

/// Start the game and call the first number (host only).
///
/// When the server is configured with an auto-call interval, a background
/// caller takes over from here.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the host
/// - `409 Conflict`: Game already ended
pub async fn start_game(
    State(state): State<AppState>,
    Extension(caller): Extension<PlayerId>,
    Path(code): Path<String>,
) -> ApiResult<Json<CallResponse>> {
    let code = parse_code(&code)?;
    state
        .service
        .ensure_host(&code, &caller)
        .await
        .map_err(error_response)?;

    let first = state
        .service
        .start_game(&code)
        .await
        .map_err(error_response)?;

    // `None` means the game was already running and has its caller.
    if first.is_some() {
        metrics::number_called();
        if let Some(period) = state.auto_call {
            spawn_auto_caller(&state, code, caller, period);
        }
    }

    Ok(Json(CallResponse::new(first)))
}

fn spawn_auto_caller(
    state: &AppState,
    code: GameCode,
    host_id: PlayerId,
    period: std::time::Duration,
) {
    let service = state.service.clone();
    tokio::spawn(async move {
        let host = match HostSession::attach(service, code.clone(), host_id).await {
            Ok(host) => host,
            Err(e) => {
                warn!("Auto-caller for game {} could not attach: {}", code, e);
                return;
            }
        };

        match host.run_auto_call(period).await {
            Ok(stopped) => info!("Auto-caller for game {} finished: {:?}", code, stopped),
            Err(e) => warn!("Auto-caller for game {} failed: {}", code, e),
        }
    });
}

/// Call the next number (host only).
///
/// # Response
///
/// ```json
/// { "number": 42, "letter": "N" }
/// ```
///
/// `number` is `null` once all 75 numbers are out.
pub async fn call_number(
    State(state): State<AppState>,
    Extension(caller): Extension<PlayerId>,
    Path(code): Path<String>,
) -> ApiResult<Json<CallResponse>> {
    let code = parse_code(&code)?;
    state
        .service
        .ensure_host(&code, &caller)
        .await
        .map_err(error_response)?;

    let number = state
        .service
        .call_number(&code)
        .await
        .map_err(error_response)?;

    if number.is_some() {
        metrics::number_called();
    }

    Ok(Json(CallResponse::new(number)))
}

/// End the game without a winner (host only). Idempotent.
pub async fn end_game(
    State(state): State<AppState>,
    Extension(caller): Extension<PlayerId>,
    Path(code): Path<String>,
) -> ApiResult<StatusCode> {
    let code = parse_code(&code)?;
    state
        .service
        .ensure_host(&code, &caller)
        .await
        .map_err(error_response)?;

    state.service.end_game(&code).await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete the game record (host only). Live subscribers get `not_found`.
pub async fn discard_game(
    State(state): State<AppState>,
    Extension(caller): Extension<PlayerId>,
    Path(code): Path<String>,
) -> ApiResult<StatusCode> {
    let code = parse_code(&code)?;
    state
        .service
        .ensure_host(&code, &caller)
        .await
        .map_err(error_response)?;

    if state
        .service
        .discard_game(&code)
        .await
        .map_err(error_response)?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_response(GameError::GameNotFound(code)))
    }
}

/// Claim the win for the caller.
///
/// The claim is checked against the stored cards and calls. The first valid
/// claim wins; later ones report the existing winner.
///
/// # Errors
///
/// - `404 Not Found`: Caller is not in this game
/// - `409 Conflict`: Game not started, or no completed line
pub async fn claim_win(
    State(state): State<AppState>,
    Extension(caller): Extension<PlayerId>,
    Path(code): Path<String>,
) -> ApiResult<Json<WinOutcome>> {
    let code = parse_code(&code)?;
    let outcome = state
        .service
        .declare_winner(&code, &caller)
        .await
        .map_err(error_response)?;

    if outcome.is_declared() {
        metrics::game_won("claim");
    }
    Ok(Json(outcome))
}

/// Pay for a manual daub on one of the caller's cards.
///
/// A daub that completes a line claims the win in the same request.
///
/// # Errors
///
/// - `400 Bad Request`: Card index out of range, or number not on the card
/// - `409 Conflict`: Number already called or marked, not enough coins,
///   or game not in play
pub async fn manual_mark(
    State(state): State<AppState>,
    Extension(caller): Extension<PlayerId>,
    Path(code): Path<String>,
    Json(request): Json<MarkRequest>,
) -> ApiResult<Json<MarkOutcome>> {
    let code = parse_code(&code)?;
    let outcome = state
        .service
        .manual_mark(&code, &caller, request.card_index, request.number)
        .await
        .map_err(error_response)?;

    if outcome.win.as_ref().is_some_and(WinOutcome::is_declared) {
        metrics::game_won("manual_mark");
    }
    Ok(Json(outcome))
}

/// Buy an extra card.
///
/// Not being able to afford it (or holding the maximum already) is not an
/// error; the response just reports `purchased: false`.
pub async fn buy_card(
    State(state): State<AppState>,
    Extension(caller): Extension<PlayerId>,
    Path(code): Path<String>,
) -> ApiResult<Json<BuyCardResponse>> {
    let code = parse_code(&code)?;
    let purchased = state
        .service
        .buy_new_card(&code, &caller)
        .await
        .map_err(error_response)?;

    Ok(Json(BuyCardResponse { purchased }))
}

/// Grant the caller a coin top-up.
pub async fn add_coins(
    State(state): State<AppState>,
    Extension(caller): Extension<PlayerId>,
    Path(code): Path<String>,
) -> ApiResult<Json<CoinsResponse>> {
    let code = parse_code(&code)?;
    let coins = state
        .service
        .add_coins(&code, &caller)
        .await
        .map_err(error_response)?;

    Ok(Json(CoinsResponse { coins }))
}

/// Players ordered by how close they are to bingo.
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let code = parse_code(&code)?;
    let board = state
        .service
        .leaderboard(&code)
        .await
        .map_err(error_response)?;
    Ok(Json(board))
}

/// One line of commentary on the game, or a fallback line when no
/// text generator is configured.
pub async fn commentary(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<CommentaryResponse>> {
    let code = parse_code(&code)?;
    let commentary = state
        .service
        .commentary(&code, state.commentary.as_deref())
        .await
        .map_err(error_response)?;

    Ok(Json(CommentaryResponse { commentary }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use family_bingo::{GameStatus, StoreError};

    #[test]
    fn test_status_mapping() {
        let code = GameCode::parse("ABCD").unwrap();
        assert_eq!(
            status_for(&GameError::GameNotFound(code)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(&GameError::NotHost), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&GameError::InvalidName(String::new())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GameError::WrongStatus {
                expected: GameStatus::Playing,
                actual: GameStatus::Ended,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&GameError::NoBingo), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&GameError::Store(StoreError::Unavailable("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_hides_store_details() {
        let (status, Json(body)) = error_response(GameError::Store(StoreError::Unavailable(
            "pg at 10.0.0.3 refused".into(),
        )));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.contains("10.0.0.3"));
    }

    #[test]
    fn test_call_response_letter() {
        let response = CallResponse::new(Some(42));
        assert_eq!(response.letter, Some('N'));
        assert_eq!(CallResponse::new(None).letter, None);
    }

    #[test]
    fn test_mark_request_uses_camel_case() {
        let request: MarkRequest =
            serde_json::from_str(r#"{"cardIndex": 1, "number": 61}"#).unwrap();
        assert_eq!(request.card_index, 1);
        assert_eq!(request.number, 61);
    }
}
