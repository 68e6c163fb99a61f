//! Host-side flow: create, start, call until the game is decided.

use crate::{
    game::{Game, GameCode, GameError, GameResult, GameStatus, LeaderboardEntry, PlayerId},
    service::GameService,
};
use tokio::time::{Duration, MissedTickBehavior, interval};

/// Why automatic calling stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallingStopped {
    /// A player won
    Winner(PlayerId),
    /// The host ended the game
    Ended,
    /// All 75 numbers are out
    Exhausted,
    /// The game record disappeared
    GameGone,
}

/// Operations available to the host of one game.
#[derive(Clone)]
pub struct HostSession {
    service: GameService,
    code: GameCode,
    host_id: PlayerId,
}

impl HostSession {
    /// Create a new game hosted by `host_id`.
    pub async fn create(service: GameService, host_id: PlayerId) -> GameResult<Self> {
        let code = service.create_game(&host_id).await?;
        Ok(Self {
            service,
            code,
            host_id,
        })
    }

    /// Take over an existing game. Fails unless `host_id` is its host.
    pub async fn attach(service: GameService, code: GameCode, host_id: PlayerId) -> GameResult<Self> {
        service.ensure_host(&code, &host_id).await?;
        Ok(Self {
            service,
            code,
            host_id,
        })
    }

    pub fn code(&self) -> &GameCode {
        &self.code
    }

    pub fn host_id(&self) -> &PlayerId {
        &self.host_id
    }

    pub async fn snapshot(&self) -> GameResult<Game> {
        self.service.get_game(&self.code).await
    }

    pub async fn start(&self) -> GameResult<Option<u8>> {
        self.service.start_game(&self.code).await
    }

    pub async fn call_next(&self) -> GameResult<Option<u8>> {
        self.service.call_number(&self.code).await
    }

    pub async fn end(&self) -> GameResult<()> {
        self.service.end_game(&self.code).await
    }

    pub async fn leaderboard(&self) -> GameResult<Vec<LeaderboardEntry>> {
        self.service.leaderboard(&self.code).await
    }

    /// Call a number every `period` until the game is decided.
    ///
    /// The first call happens one full period after this is invoked.
    pub async fn run_auto_call(&self, period: Duration) -> GameResult<CallingStopped> {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        log::info!("Auto-calling game {} every {:?}", self.code, period);

        loop {
            ticker.tick().await;

            let game = match self.service.get_game(&self.code).await {
                Ok(game) => game,
                Err(GameError::GameNotFound(_)) => return Ok(CallingStopped::GameGone),
                Err(e) => return Err(e),
            };
            if let Some(stop) = stopped(&game) {
                log::info!("Auto-calling of game {} stopped: {:?}", self.code, stop);
                return Ok(stop);
            }

            match self.service.call_number(&self.code).await {
                Ok(Some(_)) => {}
                Ok(None) => return Ok(CallingStopped::Exhausted),
                // Lost a race with a winner claim or the host's end button.
                Err(GameError::WrongStatus { .. }) => {}
                Err(GameError::GameNotFound(_)) => return Ok(CallingStopped::GameGone),
                Err(e) => return Err(e),
            }
        }
    }
}

fn stopped(game: &Game) -> Option<CallingStopped> {
    if let Some(winner) = &game.winner {
        return Some(CallingStopped::Winner(winner.id.clone()));
    }
    match game.status {
        GameStatus::Ended => Some(CallingStopped::Ended),
        _ if game.numbers_exhausted() => Some(CallingStopped::Exhausted),
        _ => None,
    }
}
