//! Store error types.

use crate::game::GameCode;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Too many concurrent writers kept invalidating the snapshot
    #[error("Game {code} is too contended, gave up after {attempts} attempts")]
    Contention { code: GameCode, attempts: usize },

    /// Could not find a free game code
    #[error("No free game code after {0} attempts")]
    CodeSpaceExhausted(usize),

    /// Backend not reachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
