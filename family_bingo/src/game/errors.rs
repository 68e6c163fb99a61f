//! Game error types.

use super::entities::{GameCode, GameStatus, PlayerId};
use crate::store::StoreError;
use thiserror::Error;

/// A game code that is not four ASCII letters or digits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid game code {0:?}: expected 4 letters or digits")]
pub struct InvalidGameCode(pub String);

/// A record that breaks one of the data model rules.
///
/// Every committed write is checked against these before it reaches the store,
/// so a violation always means the write was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("Called number {0} is outside 1..=75")]
    CalledOutOfRange(u8),

    #[error("Number {0} was called twice")]
    DuplicateCall(u8),

    #[error("Current number {0} was never called")]
    CurrentNotCalled(u8),

    #[error("Player {0} appears more than once")]
    DuplicatePlayer(PlayerId),

    #[error("Player name {0:?} must be 1-20 characters")]
    InvalidName(String),

    #[error("Player {player} holds {count} cards")]
    CardCount { player: PlayerId, count: usize },

    #[error("Value {value} does not belong in column {col}")]
    ColumnRange { col: usize, value: u8 },

    #[error("Card value {0} appears more than once")]
    DuplicateCardValue(u8),

    #[error("The FREE cell must sit exactly at the center")]
    MisplacedFree,

    #[error("Manually marked number {0} is not on the card")]
    ManualMarkNotOnCard(u8),

    #[error("Number {0} was manually marked twice")]
    DuplicateManualMark(u8),

    #[error("A winner is recorded but the game has not ended")]
    WinnerWithoutEnd,

    #[error("Status cannot move from {from} to {to}")]
    StatusRegression { from: GameStatus, to: GameStatus },

    #[error("The recorded winner cannot change")]
    WinnerChanged,

    #[error("Immutable field {0} changed")]
    ImmutableField(&'static str),

    #[error("Players, cards, calls and manual marks can only grow")]
    Shrunk,
}

/// Broad classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Game or player missing at transaction time
    NotFound,
    /// Operation attempted outside its valid state or affordability window
    InvalidPrecondition,
    /// Backing store failed
    Store,
    /// Identity or text-generation collaborator failed
    CollaboratorUnavailable,
}

/// Game errors
#[derive(Debug, Error)]
pub enum GameError {
    /// Game code could not be parsed
    #[error(transparent)]
    InvalidCode(#[from] InvalidGameCode),

    /// No record under this code
    #[error("Game {0} not found")]
    GameNotFound(GameCode),

    /// Player is not part of this game
    #[error("Player {player} not found in game {game}")]
    PlayerNotFound { game: GameCode, player: PlayerId },

    /// Display name rejected on join
    #[error("Player name {0:?} must be 1-20 characters")]
    InvalidName(String),

    /// Game is in the wrong lifecycle state for the operation
    #[error("Game is {actual}, expected {expected}")]
    WrongStatus {
        expected: GameStatus,
        actual: GameStatus,
    },

    /// Not enough coins for a paid action
    #[error("Insufficient coins: need {required}, have {available}")]
    InsufficientCoins { required: u32, available: u32 },

    /// Card index out of range for this player
    #[error("Card {0} does not exist")]
    CardNotFound(usize),

    /// Manual daub target is not on the card
    #[error("Number {0} is not on this card")]
    NumberNotOnCard(u8),

    /// Manual daub target is already called or marked
    #[error("Number {0} is already marked")]
    AlreadyMarked(u8),

    /// Winner claim without a completed line
    #[error("No completed line to claim")]
    NoBingo,

    /// Host-only action attempted by someone else
    #[error("Only the host can do that")]
    NotHost,

    /// Requested write would break the data model
    #[error("Rejected update: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Backing store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Identity or commentary collaborator failed
    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
}

impl GameError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidCode(_)
            | GameError::GameNotFound(_)
            | GameError::PlayerNotFound { .. } => ErrorKind::NotFound,
            GameError::Store(_) => ErrorKind::Store,
            GameError::CollaboratorUnavailable(_) => ErrorKind::CollaboratorUnavailable,
            _ => ErrorKind::InvalidPrecondition,
        }
    }

    /// Get a client-safe error message that doesn't leak backend details
    pub fn client_message(&self) -> String {
        match self {
            GameError::Store(_) => "Internal server error".to_string(),
            GameError::CollaboratorUnavailable(_) => "Service temporarily unavailable".to_string(),
            GameError::PlayerNotFound { .. } => "Player not found in this game".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;
