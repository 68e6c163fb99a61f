//! Host commentary.
//!
//! A text generator is consulted with a read-only summary of the game and
//! returns one short line. It never touches game state, and any failure
//! falls back to a fixed message.

use crate::game::{Game, constants::MAX_NUMBER};
use async_trait::async_trait;
use thiserror::Error;

/// Shown when no generator is configured.
pub const FALLBACK_NOT_CONFIGURED: &str = "BingoBot is sleeping... API key not configured.";

/// Shown when the generator fails.
pub const FALLBACK_FAILED: &str = "BingoBot is thinking... Something went wrong.";

/// Persona and tone passed to the generator alongside the prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are BingoBot, the cheerful assistant of a family bingo host. \
     Reply with one or two short sentences suitable for all ages. \
     Emojis are welcome, markdown is not.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentaryError {
    #[error("Commentary generator not configured")]
    NotConfigured,

    #[error("Commentary generator failed: {0}")]
    Failed(String),
}

/// What the commentary should focus on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Focus {
    /// Nothing called yet
    Welcome,
    /// Talk about the last call or overall progress
    Progress { number: u8 },
    /// Someone is a single number away
    OnTheVerge { name: String },
}

/// One player's line in the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub name: String,
    pub best_numbers_to_bingo: Option<u8>,
}

/// Read-only summary handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentaryRequest {
    pub current_number: Option<u8>,
    pub called_count: usize,
    /// Closest to a line first
    pub standings: Vec<Standing>,
    pub focus: Focus,
}

impl CommentaryRequest {
    pub fn from_game(game: &Game) -> Self {
        let standings: Vec<Standing> = game
            .leaderboard()
            .into_iter()
            .map(|entry| Standing {
                name: entry.name,
                best_numbers_to_bingo: entry.best_numbers_to_bingo,
            })
            .collect();

        let focus = match (standings.first(), game.current_number) {
            (Some(leader), _) if leader.best_numbers_to_bingo == Some(1) => Focus::OnTheVerge {
                name: leader.name.clone(),
            },
            (_, Some(number)) => Focus::Progress { number },
            _ => Focus::Welcome,
        };

        Self {
            current_number: game.current_number,
            called_count: game.called_numbers.len(),
            standings,
            focus,
        }
    }

    /// Plain-text prompt describing the game and the task.
    pub fn prompt(&self) -> String {
        let mut prompt = String::from("Current state of a family bingo game:\n");

        match self.current_number {
            Some(number) => prompt.push_str(&format!("Last number called: {number}.\n")),
            None => prompt.push_str("No number has been called yet.\n"),
        }
        prompt.push_str(&format!(
            "Numbers called so far: {} of {}.\n",
            self.called_count, MAX_NUMBER
        ));

        prompt.push_str("Players:\n");
        for standing in &self.standings {
            match standing.best_numbers_to_bingo {
                Some(n) => prompt.push_str(&format!("- {} needs {} more to win.\n", standing.name, n)),
                None => prompt.push_str(&format!("- {} needs many more to win.\n", standing.name)),
            }
        }

        prompt.push('\n');
        match &self.focus {
            Focus::OnTheVerge { name } => prompt.push_str(&format!(
                "{name} is a single number away from winning. Write a short, suspenseful line for the host."
            )),
            Focus::Progress { number } => prompt.push_str(&format!(
                "Write a brief, fun remark: a fact about the number {number}, who is getting close, or how the game is going."
            )),
            Focus::Welcome => {
                prompt.push_str("The game is about to begin. Write a short, warm welcome.")
            }
        }

        prompt
    }
}

/// External text generator.
#[async_trait]
pub trait CommentaryProvider: Send + Sync {
    async fn generate(&self, request: &CommentaryRequest) -> Result<String, CommentaryError>;
}

/// Ask the provider for a line about `game`, falling back to a fixed message
/// when there is no provider or it fails.
pub async fn commentary_or_fallback(provider: Option<&dyn CommentaryProvider>, game: &Game) -> String {
    let Some(provider) = provider else {
        return FALLBACK_NOT_CONFIGURED.to_string();
    };

    let request = CommentaryRequest::from_game(game);
    match provider.generate(&request).await {
        Ok(text) => text,
        Err(CommentaryError::NotConfigured) => FALLBACK_NOT_CONFIGURED.to_string(),
        Err(e) => {
            log::warn!("Commentary for game {} failed: {}", game.id, e);
            FALLBACK_FAILED.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{BingoCard, GameCode, Player, PlayerId};

    struct Echo;

    #[async_trait]
    impl CommentaryProvider for Echo {
        async fn generate(&self, request: &CommentaryRequest) -> Result<String, CommentaryError> {
            Ok(format!("{:?}", request.focus))
        }
    }

    struct Broken;

    #[async_trait]
    impl CommentaryProvider for Broken {
        async fn generate(&self, _: &CommentaryRequest) -> Result<String, CommentaryError> {
            Err(CommentaryError::Failed("timeout".into()))
        }
    }

    fn game() -> Game {
        let mut game = Game::new(GameCode::parse("CHAT").unwrap(), PlayerId::new("host"));
        let card = BingoCard::from_rows([
            [1, 16, 31, 46, 61],
            [2, 17, 32, 47, 62],
            [3, 18, 0, 48, 63],
            [4, 19, 34, 49, 64],
            [5, 20, 35, 50, 65],
        ]);
        for (id, name, best) in [("a", "Ann", Some(3)), ("b", "Ben", Some(1)), ("c", "Cy", None)] {
            let mut player = Player::new(PlayerId::new(id), name.to_string(), 100, card.clone());
            player.best_numbers_to_bingo = best;
            game.players.push(player);
        }
        game
    }

    #[test]
    fn test_request_orders_players_and_spots_verge() {
        let request = CommentaryRequest::from_game(&game());
        let names: Vec<_> = request.standings.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Ben", "Ann", "Cy"]);
        assert_eq!(
            request.focus,
            Focus::OnTheVerge {
                name: "Ben".to_string()
            }
        );

        let prompt = request.prompt();
        assert!(prompt.contains("0 of 75"));
        assert!(prompt.contains("Cy needs many more"));
    }

    #[test]
    fn test_focus_falls_back_to_progress_and_welcome() {
        let mut game = game();
        game.players.retain(|p| p.name != "Ben");
        assert_eq!(CommentaryRequest::from_game(&game).focus, Focus::Welcome);

        game.called_numbers.push(42);
        game.current_number = Some(42);
        assert_eq!(
            CommentaryRequest::from_game(&game).focus,
            Focus::Progress { number: 42 }
        );
    }

    #[tokio::test]
    async fn test_fallbacks() {
        let game = game();
        assert_eq!(
            commentary_or_fallback(None, &game).await,
            FALLBACK_NOT_CONFIGURED
        );
        assert_eq!(
            commentary_or_fallback(Some(&Broken), &game).await,
            FALLBACK_FAILED
        );
        assert!(
            commentary_or_fallback(Some(&Echo), &game)
                .await
                .contains("OnTheVerge")
        );
    }
}
