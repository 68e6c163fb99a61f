//! In-process game store.

use super::{CasOutcome, GameStore, StoreResult, Versioned};
use crate::game::{Game, GameCode};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Map of games guarded by a read-write lock. Versions start at 1.
#[derive(Default)]
pub struct MemoryGameStore {
    games: RwLock<HashMap<GameCode, Versioned<Game>>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn load(&self, code: &GameCode) -> StoreResult<Option<Versioned<Game>>> {
        let games = self.games.read().await;
        Ok(games.get(code).cloned())
    }

    async fn insert_new(&self, game: &Game) -> StoreResult<Option<u64>> {
        let mut games = self.games.write().await;
        if games.contains_key(&game.id) {
            return Ok(None);
        }

        games.insert(
            game.id.clone(),
            Versioned {
                version: 1,
                value: game.clone(),
            },
        );
        Ok(Some(1))
    }

    async fn compare_and_swap(
        &self,
        code: &GameCode,
        expected_version: u64,
        game: &Game,
    ) -> StoreResult<CasOutcome> {
        let mut games = self.games.write().await;
        match games.get_mut(code) {
            Some(current) if current.version == expected_version => {
                current.version += 1;
                current.value = game.clone();
                Ok(CasOutcome::Committed {
                    version: current.version,
                })
            }
            _ => Ok(CasOutcome::Conflict),
        }
    }

    async fn compare_and_delete(
        &self,
        code: &GameCode,
        expected_version: u64,
    ) -> StoreResult<CasOutcome> {
        let mut games = self.games.write().await;
        match games.get(code) {
            Some(current) if current.version == expected_version => {
                games.remove(code);
                Ok(CasOutcome::Committed {
                    version: expected_version + 1,
                })
            }
            _ => Ok(CasOutcome::Conflict),
        }
    }

    async fn count(&self) -> StoreResult<usize> {
        let games = self.games.read().await;
        Ok(games.len())
    }
}
