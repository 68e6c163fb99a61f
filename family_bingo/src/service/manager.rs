//! Game service: every mutation of a game goes through here.
//!
//! Each operation is a closure applied to a freshly read copy of the record.
//! The result is validated against the data model and written back only if
//! the record is still at the version that was read; otherwise the closure
//! runs again on the newer copy. Committed records are handed to the
//! subscription hub right after the write.

use super::{
    hub::{GameUpdate, Subscription, SubscriptionHandle, SubscriptionHub},
    messages::{JoinOutcome, MarkOutcome, PlayerUpdate, WinOutcome},
};
use crate::{
    commentary::{self, CommentaryProvider},
    game::{
        Game, GameCode, GameError, GameResult, GameRules, GameStatus, LeaderboardEntry, Player,
        PlayerId, constants::MAX_NUMBER, generate_card, letter_for,
    },
    store::{CasOutcome, GameStore, MemoryGameStore, StoreError},
};
use rand::Rng;
use std::sync::Arc;
use tokio::time::{Duration, sleep};

/// Attempts at a read-modify-write before giving up with `StoreError::Contention`.
pub const MAX_TRANSACTION_ATTEMPTS: usize = 16;

/// Upper bound of the random pause after a conflict, scaled by the attempt number.
const RETRY_JITTER_MICROS: u64 = 200;

/// Random codes tried before creation fails.
pub const MAX_CODE_ATTEMPTS: usize = 32;

/// What a transaction closure decided.
enum Tx<R> {
    /// Write the modified copy, then return the value
    Write(R),
    /// Discard the copy and return the value without writing
    NoOp(R),
}

/// Entry point for all game operations.
#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn GameStore>,
    hub: Arc<SubscriptionHub>,
    rules: GameRules,
}

impl GameService {
    pub fn new(store: Arc<dyn GameStore>, rules: GameRules) -> Self {
        Self {
            store,
            hub: Arc::new(SubscriptionHub::new()),
            rules,
        }
    }

    /// Service over a fresh in-process store with default rules.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryGameStore::new()), GameRules::default())
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn hub(&self) -> &Arc<SubscriptionHub> {
        &self.hub
    }

    pub async fn game_count(&self) -> GameResult<usize> {
        Ok(self.store.count().await?)
    }

    /// Run `mutate` against the latest record until it commits without conflict.
    async fn transact<R, F>(&self, code: &GameCode, mut mutate: F) -> GameResult<R>
    where
        F: FnMut(&mut Game) -> GameResult<Tx<R>> + Send,
        R: Send,
    {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let current = self
                .store
                .load(code)
                .await?
                .ok_or_else(|| GameError::GameNotFound(code.clone()))?;

            let mut next = current.value.clone();
            let value = match mutate(&mut next)? {
                Tx::NoOp(value) => return Ok(value),
                Tx::Write(value) => value,
            };

            current.value.validate_transition(&next, &self.rules)?;
            next.validate()?;

            match self
                .store
                .compare_and_swap(code, current.version, &next)
                .await?
            {
                CasOutcome::Committed { version } => {
                    self.hub.publish(code, version, Arc::new(next));
                    return Ok(value);
                }
                CasOutcome::Conflict => {
                    log::debug!(
                        "Game {} changed during update (attempt {}), retrying",
                        code,
                        attempt
                    );
                    backoff(attempt).await;
                }
            }
        }

        log::warn!(
            "Game {}: giving up after {} conflicting attempts",
            code,
            MAX_TRANSACTION_ATTEMPTS
        );
        Err(StoreError::Contention {
            code: code.clone(),
            attempts: MAX_TRANSACTION_ATTEMPTS,
        }
        .into())
    }

    /// Create a game hosted by `host_id` under a fresh random code.
    pub async fn create_game(&self, host_id: &PlayerId) -> GameResult<GameCode> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = GameCode::generate(&mut rand::rng());
            let game = Game::new(code.clone(), host_id.clone());

            if let Some(version) = self.store.insert_new(&game).await? {
                log::info!("Game {} created by host {}", code, host_id);
                self.hub.publish_created(&code, version, Arc::new(game));
                return Ok(code);
            }

            log::debug!("Game code {} is taken, drawing another", code);
        }

        log::error!(
            "No free game code after {} attempts",
            MAX_CODE_ATTEMPTS
        );
        Err(StoreError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS).into())
    }

    pub async fn get_game(&self, code: &GameCode) -> GameResult<Game> {
        self.store
            .load(code)
            .await?
            .map(|record| record.value)
            .ok_or_else(|| GameError::GameNotFound(code.clone()))
    }

    /// Add a player with one fresh card. Joining twice is a no-op.
    pub async fn join_game(
        &self,
        code: &GameCode,
        player_id: &PlayerId,
        name: &str,
    ) -> GameResult<JoinOutcome> {
        let name = Player::normalize_name(name)?;
        let initial_coins = self.rules.initial_coins;

        let result = self
            .transact(code, |game| {
                if game.player(player_id).is_some() {
                    return Ok(Tx::NoOp(JoinOutcome::AlreadyJoined));
                }
                if game.status != GameStatus::Waiting {
                    return Err(GameError::WrongStatus {
                        expected: GameStatus::Waiting,
                        actual: game.status,
                    });
                }

                let mut player =
                    Player::new(player_id.clone(), name.clone(), initial_coins, generate_card());
                player.best_numbers_to_bingo =
                    Some(player.numbers_to_bingo(&game.called_numbers));
                game.players.push(player);

                Ok(Tx::Write(JoinOutcome::Joined))
            })
            .await;

        match &result {
            Ok(JoinOutcome::Joined) => log::info!("{} ({}) joined game {}", name, player_id, code),
            Ok(JoinOutcome::AlreadyJoined) => {
                log::debug!("{} rejoined game {}", player_id, code)
            }
            Err(e) => log::warn!("Join of {} to game {} failed: {}", player_id, code, e),
        }
        result
    }

    /// Move the game from the lobby into play and call the first number in the
    /// same write. Returns that number; `None` if the game was already playing.
    pub async fn start_game(&self, code: &GameCode) -> GameResult<Option<u8>> {
        let per_match = self.rules.coin_award_match;
        let first = self
            .transact(code, |game| match game.status {
                GameStatus::Waiting => {
                    game.status = GameStatus::Playing;
                    Ok(Tx::Write(Some(call_next(game, per_match))))
                }
                GameStatus::Playing => Ok(Tx::NoOp(None)),
                GameStatus::Ended => Err(GameError::WrongStatus {
                    expected: GameStatus::Waiting,
                    actual: GameStatus::Ended,
                }),
            })
            .await?;

        if let Some(number) = first {
            log::info!(
                "Game {} started, first call {}{}",
                code,
                letter_for(number).unwrap_or('?'),
                number
            );
        }
        Ok(first)
    }

    /// Call one number not called before. `None` once all 75 are out.
    ///
    /// Every player is credited the match award for each of their cards
    /// holding the number, in the same write.
    pub async fn call_number(&self, code: &GameCode) -> GameResult<Option<u8>> {
        let per_match = self.rules.coin_award_match;
        let called = self
            .transact(code, |game| {
                if game.status != GameStatus::Playing {
                    return Err(GameError::WrongStatus {
                        expected: GameStatus::Playing,
                        actual: game.status,
                    });
                }
                if game.numbers_exhausted() {
                    return Ok(Tx::NoOp(None));
                }
                Ok(Tx::Write(Some(call_next(game, per_match))))
            })
            .await?;

        match called {
            Some(number) => log::debug!(
                "Game {} called {}{}",
                code,
                letter_for(number).unwrap_or('?'),
                number
            ),
            None => log::info!("Game {}: all {} numbers called", code, MAX_NUMBER),
        }
        Ok(called)
    }

    /// Overwrite the given fields of one player, leaving everyone else alone.
    pub async fn update_player_data(
        &self,
        code: &GameCode,
        player_id: &PlayerId,
        update: PlayerUpdate,
    ) -> GameResult<()> {
        if update.is_empty() {
            return Ok(());
        }

        self.transact(code, |game| {
            let (player, _) = locate(game, player_id)?;
            if let Some(coins) = update.coins {
                player.coins = coins;
            }
            if let Some(cards) = &update.cards {
                player.cards = cards.clone();
            }
            if let Some(best) = update.best_numbers_to_bingo {
                player.best_numbers_to_bingo = Some(best);
            }
            Ok(Tx::Write(()))
        })
        .await
    }

    /// Buy one more card. Returns `false`, changing nothing, when the player
    /// is at the card cap or cannot afford it.
    pub async fn buy_new_card(&self, code: &GameCode, player_id: &PlayerId) -> GameResult<bool> {
        let rules = self.rules;

        let bought = self
            .transact(code, |game| {
                if game.status == GameStatus::Ended {
                    return Ok(Tx::NoOp(false));
                }

                let (player, called) = locate(game, player_id)?;
                if !rules.can_buy_card(player.cards.len(), player.coins) {
                    return Ok(Tx::NoOp(false));
                }

                player.coins -= rules.buy_card_cost;
                player.cards.push(generate_card());
                player.best_numbers_to_bingo = Some(player.numbers_to_bingo(called));
                Ok(Tx::Write(true))
            })
            .await?;

        if bought {
            log::info!("{} bought a card in game {}", player_id, code);
        } else {
            log::debug!("{} could not buy a card in game {}", player_id, code);
        }
        Ok(bought)
    }

    /// Grant the fixed coin top-up. Returns the new balance.
    pub async fn add_coins(&self, code: &GameCode, player_id: &PlayerId) -> GameResult<u32> {
        let amount = self.rules.add_coins_amount;

        self.transact(code, |game| {
            let (player, _) = locate(game, player_id)?;
            player.coins = player.coins.saturating_add(amount);
            Ok(Tx::Write(player.coins))
        })
        .await
    }

    /// Pay to mark an uncalled number on one of the player's cards. A mark
    /// that completes a line is followed straight away by a winner claim.
    pub async fn manual_mark(
        &self,
        code: &GameCode,
        player_id: &PlayerId,
        card_index: usize,
        number: u8,
    ) -> GameResult<MarkOutcome> {
        let cost = self.rules.manual_daub_cost;

        let (coins, bingo) = self
            .transact(code, |game| {
                if game.status != GameStatus::Playing {
                    return Err(GameError::WrongStatus {
                        expected: GameStatus::Playing,
                        actual: game.status,
                    });
                }

                let (player, called) = locate(game, player_id)?;
                let card = player
                    .cards
                    .get(card_index)
                    .ok_or(GameError::CardNotFound(card_index))?;
                if !card.contains(number) {
                    return Err(GameError::NumberNotOnCard(number));
                }
                if called.contains(&number) || card.is_manually_marked(number) {
                    return Err(GameError::AlreadyMarked(number));
                }
                if player.coins < cost {
                    return Err(GameError::InsufficientCoins {
                        required: cost,
                        available: player.coins,
                    });
                }

                player.coins -= cost;
                player.cards[card_index].manually_marked_numbers.push(number);
                player.best_numbers_to_bingo = Some(player.numbers_to_bingo(called));

                Ok(Tx::Write((player.coins, player.has_bingo(called))))
            })
            .await
            .inspect_err(|e| {
                log::debug!("Manual mark of {} by {} in {} rejected: {}", number, player_id, code, e)
            })?;

        log::debug!("{} marked {} in game {} ({} coins left)", player_id, number, code, coins);

        let win = if bingo {
            Some(self.declare_winner(code, player_id).await?)
        } else {
            None
        };

        Ok(MarkOutcome { coins, bingo, win })
    }

    /// Recompute the player's cached progress; writes only when it changed.
    pub async fn refresh_best_numbers(
        &self,
        code: &GameCode,
        player_id: &PlayerId,
    ) -> GameResult<u8> {
        self.transact(code, |game| {
            let (player, called) = locate(game, player_id)?;
            let best = player.numbers_to_bingo(called);
            if player.best_numbers_to_bingo == Some(best) {
                return Ok(Tx::NoOp(best));
            }
            player.best_numbers_to_bingo = Some(best);
            Ok(Tx::Write(best))
        })
        .await
    }

    /// Record `player_id` as the winner and end the game, unless a winner
    /// already exists or the game is over. The claim is checked against the
    /// player's cards as stored, not as the caller last saw them.
    pub async fn declare_winner(
        &self,
        code: &GameCode,
        player_id: &PlayerId,
    ) -> GameResult<WinOutcome> {
        let outcome = self
            .transact(code, |game| {
                if let Some(winner) = &game.winner {
                    return Ok(Tx::NoOp(WinOutcome::AlreadyDecided {
                        winner: Some(winner.id.clone()),
                    }));
                }
                match game.status {
                    GameStatus::Ended => {
                        return Ok(Tx::NoOp(WinOutcome::AlreadyDecided { winner: None }));
                    }
                    GameStatus::Waiting => {
                        return Err(GameError::WrongStatus {
                            expected: GameStatus::Playing,
                            actual: GameStatus::Waiting,
                        });
                    }
                    GameStatus::Playing => {}
                }

                let (player, called) = locate(game, player_id)?;
                if !player.has_bingo(called) {
                    return Err(GameError::NoBingo);
                }
                player.best_numbers_to_bingo = Some(0);
                let winner = player.clone();

                game.winner = Some(winner.clone());
                game.status = GameStatus::Ended;
                Ok(Tx::Write(WinOutcome::Declared { winner }))
            })
            .await?;

        match &outcome {
            WinOutcome::Declared { winner } => {
                log::info!("Game {} won by {} ({})", code, winner.name, winner.id)
            }
            WinOutcome::AlreadyDecided { .. } => {
                log::debug!("Late winner claim by {} in game {} ignored", player_id, code)
            }
        }
        Ok(outcome)
    }

    /// End the game without a winner. Ending twice is a no-op.
    pub async fn end_game(&self, code: &GameCode) -> GameResult<()> {
        let ended = self
            .transact(code, |game| {
                if game.status == GameStatus::Ended {
                    return Ok(Tx::NoOp(false));
                }
                game.status = GameStatus::Ended;
                Ok(Tx::Write(true))
            })
            .await?;

        if ended {
            log::info!("Game {} ended by host", code);
        }
        Ok(())
    }

    /// Delete the record. Subscribers are told the game no longer exists.
    /// Returns false if there was nothing to delete.
    ///
    /// The delete is conditional on the version just read, so the `NotFound`
    /// it publishes is ordered after every snapshot committed before it.
    pub async fn discard_game(&self, code: &GameCode) -> GameResult<bool> {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let Some(current) = self.store.load(code).await? else {
                return Ok(false);
            };

            match self.store.compare_and_delete(code, current.version).await? {
                CasOutcome::Committed { version } => {
                    log::info!("Game {} discarded", code);
                    self.hub.publish_absent(code, version);
                    return Ok(true);
                }
                CasOutcome::Conflict => {
                    log::debug!(
                        "Game {} changed during discard (attempt {}), retrying",
                        code,
                        attempt
                    );
                    backoff(attempt).await;
                }
            }
        }

        Err(StoreError::Contention {
            code: code.clone(),
            attempts: MAX_TRANSACTION_ATTEMPTS,
        }
        .into())
    }

    /// Load the game and check that `caller` is its host.
    pub async fn ensure_host(&self, code: &GameCode, caller: &PlayerId) -> GameResult<Game> {
        let game = self.get_game(code).await?;
        if !game.is_host(caller) {
            log::warn!("{} attempted a host action on game {}", caller, code);
            return Err(GameError::NotHost);
        }
        Ok(game)
    }

    pub async fn leaderboard(&self, code: &GameCode) -> GameResult<Vec<LeaderboardEntry>> {
        Ok(self.get_game(code).await?.leaderboard())
    }

    /// Start listening to `code`. The current state (or `NotFound`) is the
    /// first update delivered.
    pub async fn subscribe(&self, code: &GameCode) -> GameResult<Subscription> {
        let subscription = self.hub.register(code);

        let initial = match self.store.load(code).await? {
            Some(record) => GameUpdate::Snapshot {
                version: record.version,
                game: Arc::new(record.value),
            },
            None => GameUpdate::NotFound,
        };
        self.hub.deliver(code, subscription.id(), initial);

        Ok(subscription)
    }

    /// Like [`subscribe`](Self::subscribe), invoking `callback` for each update.
    pub async fn subscribe_with<F>(&self, code: &GameCode, callback: F) -> GameResult<SubscriptionHandle>
    where
        F: FnMut(GameUpdate) + Send + 'static,
    {
        Ok(self.subscribe(code).await?.spawn_with(callback))
    }

    /// One line of commentary on the current state, or a fallback message.
    pub async fn commentary(
        &self,
        code: &GameCode,
        provider: Option<&dyn CommentaryProvider>,
    ) -> GameResult<String> {
        let game = self.get_game(code).await?;
        Ok(commentary::commentary_or_fallback(provider, &game).await)
    }
}

/// Random pause before retrying a conflicted write, growing with `attempt`.
async fn backoff(attempt: usize) {
    let jitter = rand::rng().random_range(0..=RETRY_JITTER_MICROS * attempt as u64);
    sleep(Duration::from_micros(jitter)).await;
}

/// Find a player together with the called numbers, borrowed side by side.
fn locate<'a>(game: &'a mut Game, player_id: &PlayerId) -> GameResult<(&'a mut Player, &'a [u8])> {
    let Game {
        id,
        players,
        called_numbers,
        ..
    } = game;

    let player = players
        .iter_mut()
        .find(|p| &p.id == player_id)
        .ok_or_else(|| GameError::PlayerNotFound {
            game: id.clone(),
            player: player_id.clone(),
        })?;

    Ok((player, called_numbers.as_slice()))
}

/// Draw uniformly until an uncalled number comes up.
fn draw_uncalled<R: Rng + ?Sized>(rng: &mut R, called: &[u8]) -> u8 {
    loop {
        let number = rng.random_range(1..=MAX_NUMBER);
        if !called.contains(&number) {
            return number;
        }
    }
}

/// Append a new call, pay `per_match` for every card holding it and refresh
/// every player's progress. The caller checks the numbers are not exhausted.
fn call_next(game: &mut Game, per_match: u32) -> u8 {
    let number = draw_uncalled(&mut rand::rng(), &game.called_numbers);
    game.called_numbers.push(number);
    game.current_number = Some(number);

    for player in game.players.iter_mut() {
        let matches = player.cards.iter().filter(|card| card.contains(number)).count() as u32;
        player.coins = player
            .coins
            .saturating_add(per_match.saturating_mul(matches));
        player.best_numbers_to_bingo = Some(player.numbers_to_bingo(&game.called_numbers));
    }
    number
}
