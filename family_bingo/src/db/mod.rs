//! PostgreSQL connection pooling for the game store.

use crate::store::{PgGameStore, StoreResult};
use sqlx::postgres::PgPool;
use std::sync::Arc;

pub mod config;

pub use config::DatabaseConfig;

/// Connected pool with the `games` schema in place.
///
/// Cloning shares the pool.
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Open the pool and create the `games` table if needed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use family_bingo::{GameRules, GameService, db::{Database, DatabaseConfig}};
    /// use std::sync::Arc;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), family_bingo::StoreError> {
    ///     let db = Database::connect(&DatabaseConfig::development()).await?;
    ///     let service = GameService::new(Arc::new(db.game_store()), GameRules::default());
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = config
            .pool_options()
            .connect(&config.database_url)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
        };
        db.game_store().migrate().await?;

        log::info!(
            "Connected to PostgreSQL (pool {}..{})",
            config.min_connections,
            config.max_connections
        );
        Ok(db)
    }

    /// Game store sharing this pool.
    pub fn game_store(&self) -> PgGameStore {
        PgGameStore::new(self.pool.clone())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round trip to the server.
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Wait for checked-out connections to return, then close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
