//! Bingo rules engine - data model, card generation and win detection.
//!
//! This module provides:
//! - The persisted game record (`Game`, `Player`, `BingoCard`) and its validation
//! - Random card generation honoring the B-I-N-G-O column ranges
//! - Line detection and "numbers to bingo" progress
//! - The economy rules applied by the mutation protocol

pub mod card;
pub mod constants;
pub mod entities;
pub mod errors;
pub mod evaluator;
pub mod rules;

pub use card::{generate_card, generate_card_with};
pub use constants::letter_for;
pub use entities::{
    BingoCard, CardGrid, Cell, Game, GameCode, GameStatus, LeaderboardEntry, Player, PlayerId,
};
pub use errors::{ErrorKind, GameError, GameResult, InvalidGameCode, InvariantViolation};
pub use evaluator::{Line, Marks, has_bingo, is_marked, numbers_to_bingo};
pub use rules::GameRules;
