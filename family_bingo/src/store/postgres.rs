//! PostgreSQL game store.
#![allow(clippy::needless_raw_string_hashes)]

use super::{CasOutcome, GameStore, StoreResult, Versioned};
use crate::game::{Game, GameCode};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

const SCHEMA: &str = include_str!("../../migrations/001_games.sql");

/// One row per game: the whole record as a JSON document plus a version
/// counter used for conditional updates.
#[derive(Clone)]
pub struct PgGameStore {
    pool: Arc<PgPool>,
}

impl PgGameStore {
    /// Create a new store
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create the `games` table if it does not exist
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(self.pool.as_ref()).await?;
        Ok(())
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn load(&self, code: &GameCode) -> StoreResult<Option<Versioned<Game>>> {
        let row = sqlx::query(
            r#"
            SELECT version, document::text AS document
            FROM games
            WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(self.pool.as_ref())
        .await?;

        match row {
            Some(row) => {
                let document: String = row.get("document");
                Ok(Some(Versioned {
                    version: row.get::<i64, _>("version") as u64,
                    value: serde_json::from_str(&document)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn insert_new(&self, game: &Game) -> StoreResult<Option<u64>> {
        let document = serde_json::to_string(game)?;

        let result = sqlx::query(
            r#"
            INSERT INTO games (code, version, document)
            VALUES ($1, 1, $2::jsonb)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(game.id.as_str())
        .bind(document)
        .execute(self.pool.as_ref())
        .await?;

        Ok((result.rows_affected() == 1).then_some(1))
    }

    async fn compare_and_swap(
        &self,
        code: &GameCode,
        expected_version: u64,
        game: &Game,
    ) -> StoreResult<CasOutcome> {
        let document = serde_json::to_string(game)?;

        let result = sqlx::query(
            r#"
            UPDATE games
            SET document = $3::jsonb, version = version + 1, updated_at = NOW()
            WHERE code = $1 AND version = $2
            "#,
        )
        .bind(code.as_str())
        .bind(expected_version as i64)
        .bind(document)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 1 {
            Ok(CasOutcome::Committed {
                version: expected_version + 1,
            })
        } else {
            Ok(CasOutcome::Conflict)
        }
    }

    async fn compare_and_delete(
        &self,
        code: &GameCode,
        expected_version: u64,
    ) -> StoreResult<CasOutcome> {
        let result = sqlx::query("DELETE FROM games WHERE code = $1 AND version = $2")
            .bind(code.as_str())
            .bind(expected_version as i64)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 1 {
            Ok(CasOutcome::Committed {
                version: expected_version + 1,
            })
        } else {
            Ok(CasOutcome::Conflict)
        }
    }

    async fn count(&self) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM games")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count as usize)
    }
}
