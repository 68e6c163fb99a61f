//! Game economy configuration.

use super::constants::{
    DEFAULT_ADD_COINS_AMOUNT, DEFAULT_BUY_CARD_COST, DEFAULT_COIN_AWARD_MATCH,
    DEFAULT_INITIAL_COINS, DEFAULT_MANUAL_DAUB_COST, DEFAULT_MAX_CARDS,
};
use serde::{Deserialize, Serialize};

/// Prices and amounts applied by the mutation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRules {
    /// Balance a player starts with
    pub initial_coins: u32,

    /// Coins per (card, newly called number) match
    pub coin_award_match: u32,

    /// Price of one manual daub
    pub manual_daub_cost: u32,

    /// Price of an extra card
    pub buy_card_cost: u32,

    /// Coins granted by the "get coins" action
    pub add_coins_amount: u32,

    /// Maximum cards per player (at least 1)
    pub max_cards: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            initial_coins: DEFAULT_INITIAL_COINS,
            coin_award_match: DEFAULT_COIN_AWARD_MATCH,
            manual_daub_cost: DEFAULT_MANUAL_DAUB_COST,
            buy_card_cost: DEFAULT_BUY_CARD_COST,
            add_coins_amount: DEFAULT_ADD_COINS_AMOUNT,
            max_cards: DEFAULT_MAX_CARDS,
        }
    }
}

impl GameRules {
    /// Validate rules
    pub fn validate(&self) -> Result<(), String> {
        if self.max_cards == 0 {
            return Err("Max cards must be at least 1".to_string());
        }

        if self.manual_daub_cost == 0 {
            return Err("Manual daub cost must be greater than 0".to_string());
        }

        if self.buy_card_cost == 0 {
            return Err("Card cost must be greater than 0".to_string());
        }

        if self.add_coins_amount == 0 {
            return Err("Coin grant must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Whether a player holding `cards` cards with `coins` coins may buy another card.
    pub fn can_buy_card(&self, cards: usize, coins: u32) -> bool {
        cards < self.max_cards && coins >= self.buy_card_cost
    }
}
