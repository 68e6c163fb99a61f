//! Player-side flow driven by game snapshots.

use crate::{
    game::{Game, GameCode, GameError, GameResult, GameStatus, PlayerId},
    identity::IdentityProvider,
    service::{GameService, GameUpdate, JoinOutcome, WinOutcome},
};

/// Why a player session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// This player was recorded as the winner
    Won,
    /// Someone else won, or the host ended the game (`winner` is `None`)
    Lost { winner: Option<PlayerId> },
    /// The game record disappeared
    GameGone,
    /// The player is not part of the game
    NotInGame,
}

/// Reacts to each snapshot of one game on behalf of one player. It keeps the
/// progress projection current and claims the win as soon as one of the
/// player's cards completes a line. Match coins are credited by the call itself.
pub struct PlayerSession {
    service: GameService,
    code: GameCode,
    player_id: PlayerId,
}

impl PlayerSession {
    pub fn new(service: GameService, code: GameCode, player_id: PlayerId) -> Self {
        Self {
            service,
            code,
            player_id,
        }
    }

    /// Obtain an identity and join the game under `name`.
    pub async fn join(
        service: GameService,
        code: GameCode,
        identity: &dyn IdentityProvider,
        name: &str,
    ) -> GameResult<(Self, JoinOutcome)> {
        let player_id = identity.identity().await.map_err(GameError::from)?;
        let outcome = service.join_game(&code, &player_id, name).await?;
        Ok((Self::new(service, code, player_id), outcome))
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    pub fn code(&self) -> &GameCode {
        &self.code
    }

    /// Handle one update. Returns `Some` once the session is over.
    pub async fn on_update(&mut self, update: &GameUpdate) -> GameResult<Option<SessionEnd>> {
        let Some(game) = update.game() else {
            return Ok(Some(SessionEnd::GameGone));
        };

        let Some(me) = game.player(&self.player_id) else {
            return Ok(Some(SessionEnd::NotInGame));
        };

        match game.status {
            GameStatus::Waiting => return Ok(None),
            GameStatus::Ended => return Ok(Some(self.outcome(game))),
            GameStatus::Playing => {}
        }

        // Cards bought mid-game leave the stored projection stale.
        self.service
            .refresh_best_numbers(&self.code, &self.player_id)
            .await?;

        if game.winner.is_none() && me.has_bingo(&game.called_numbers) {
            match self.service.declare_winner(&self.code, &self.player_id).await {
                Ok(WinOutcome::Declared { .. }) => return Ok(Some(SessionEnd::Won)),
                Ok(WinOutcome::AlreadyDecided { winner }) => {
                    return Ok(Some(SessionEnd::Lost { winner }));
                }
                Err(GameError::NoBingo) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Follow the game until it ends for this player.
    pub async fn run(mut self) -> GameResult<SessionEnd> {
        let mut subscription = self.service.subscribe(&self.code).await?;

        while let Some(update) = subscription.recv().await {
            match self.on_update(&update).await {
                Ok(Some(end)) => {
                    log::info!("Session of {} in game {} over: {:?}", self.player_id, self.code, end);
                    return Ok(end);
                }
                Ok(None) => {}
                Err(e) => log::warn!(
                    "Session of {} in game {}: update failed: {}",
                    self.player_id,
                    self.code,
                    e
                ),
            }
        }

        Ok(SessionEnd::GameGone)
    }

    fn outcome(&self, game: &Game) -> SessionEnd {
        match &game.winner {
            Some(winner) if winner.id == self.player_id => SessionEnd::Won,
            Some(winner) => SessionEnd::Lost {
                winner: Some(winner.id.clone()),
            },
            None => SessionEnd::Lost { winner: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        game::{BingoCard, GameRules, Player},
        store::{GameStore, MemoryGameStore},
    };
    use std::sync::Arc;

    fn card() -> BingoCard {
        BingoCard::from_rows([
            [1, 16, 31, 46, 61],
            [2, 17, 32, 47, 62],
            [3, 18, 0, 48, 63],
            [4, 19, 34, 49, 64],
            [5, 20, 35, 50, 65],
        ])
    }

    async fn seeded(status: GameStatus, called: Vec<u8>) -> (GameService, Game) {
        let store = Arc::new(MemoryGameStore::new());
        let mut game = Game::new(GameCode::parse("PLAY").unwrap(), PlayerId::new("host"));
        game.players
            .push(Player::new(PlayerId::new("me"), "Me".into(), 100, card()));
        game.status = status;
        game.current_number = called.last().copied();
        game.called_numbers = called;
        store.insert_new(&game).await.unwrap();
        (GameService::new(store, GameRules::default()), game)
    }

    fn snapshot(game: Game) -> GameUpdate {
        GameUpdate::Snapshot {
            version: 1,
            game: Arc::new(game),
        }
    }

    #[tokio::test]
    async fn test_refreshes_progress_without_paying() {
        let (service, game) = seeded(GameStatus::Playing, vec![1, 70]).await;
        let mut session = PlayerSession::new(service.clone(), game.id.clone(), PlayerId::new("me"));

        assert_eq!(session.on_update(&snapshot(game.clone())).await.unwrap(), None);
        assert_eq!(session.on_update(&snapshot(game.clone())).await.unwrap(), None);

        let me = service.get_game(&game.id).await.unwrap().players[0].clone();
        assert_eq!(me.coins, 100);
        // 1 sits on the diagonal through FREE.
        assert_eq!(me.best_numbers_to_bingo, Some(3));
    }

    #[tokio::test]
    async fn test_claims_win_on_completed_line() {
        let (service, game) = seeded(GameStatus::Playing, vec![1, 16, 31, 46, 61]).await;
        let mut session = PlayerSession::new(service.clone(), game.id.clone(), PlayerId::new("me"));

        assert_eq!(
            session.on_update(&snapshot(game.clone())).await.unwrap(),
            Some(SessionEnd::Won)
        );

        let stored = service.get_game(&game.id).await.unwrap();
        assert_eq!(stored.status, GameStatus::Ended);
        assert_eq!(stored.winner.unwrap().id, PlayerId::new("me"));
    }

    #[tokio::test]
    async fn test_stops_on_end_and_absence() {
        let (service, game) = seeded(GameStatus::Ended, vec![7]).await;
        let mut session = PlayerSession::new(service, game.id.clone(), PlayerId::new("me"));

        assert_eq!(
            session.on_update(&snapshot(game)).await.unwrap(),
            Some(SessionEnd::Lost { winner: None })
        );
        assert_eq!(
            session.on_update(&GameUpdate::NotFound).await.unwrap(),
            Some(SessionEnd::GameGone)
        );
    }

    #[tokio::test]
    async fn test_join_uses_identity() {
        let (service, game) = seeded(GameStatus::Waiting, Vec::new()).await;
        let identity = PlayerId::new("newcomer");

        let (session, outcome) = PlayerSession::join(service.clone(), game.id.clone(), &identity, "New")
            .await
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Joined);
        assert_eq!(session.player_id(), &identity);
        assert_eq!(service.get_game(&game.id).await.unwrap().players.len(), 2);
    }
}
