//! Request and outcome types for game mutations.

use crate::game::{BingoCard, Player, PlayerId};
use serde::{Deserialize, Serialize};

/// Result of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    /// Player was added with a fresh card
    Joined,
    /// Player was already in the game; nothing changed
    AlreadyJoined,
}

/// Result of a winner claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WinOutcome {
    /// The claim was accepted; this is the frozen winner record
    Declared { winner: Player },
    /// The game was already over. `winner` is `None` when the host ended it.
    AlreadyDecided { winner: Option<PlayerId> },
}

impl WinOutcome {
    pub fn is_declared(&self) -> bool {
        matches!(self, WinOutcome::Declared { .. })
    }
}

/// Result of a paid manual mark
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOutcome {
    /// Coins left after paying
    pub coins: u32,
    /// The mark completed a line on one of the player's cards
    pub bingo: bool,
    /// Outcome of the follow-up winner claim, present when `bingo` is set
    pub win: Option<WinOutcome>,
}

/// Partial update of one player's fields. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub coins: Option<u32>,
    pub cards: Option<Vec<BingoCard>>,
    pub best_numbers_to_bingo: Option<u8>,
}

impl PlayerUpdate {
    pub fn coins(coins: u32) -> Self {
        Self {
            coins: Some(coins),
            ..Self::default()
        }
    }

    pub fn best_numbers_to_bingo(best: u8) -> Self {
        Self {
            best_numbers_to_bingo: Some(best),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_none() && self.cards.is_none() && self.best_numbers_to_bingo.is_none()
    }
}
