//! Game store - the persisted, shared record of every game.
//!
//! The store only knows how to read a record with its version and how to
//! replace it if nobody else got there first. The read-validate-write loop
//! built on top of that lives in [`crate::service`].
//!
//! ## Backends
//!
//! - [`MemoryGameStore`]: mutex-guarded map for a single node and for tests
//! - [`PgGameStore`]: one PostgreSQL row per game with a version column

pub mod errors;
pub mod memory;
pub mod postgres;

use crate::game::{Game, GameCode};
use async_trait::async_trait;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryGameStore;
pub use postgres::PgGameStore;

/// A record together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// Write applied; the record now has this version. For a delete it is
    /// the version the deletion occupies, one past the last stored one.
    Committed { version: u64 },
    /// Record changed (or vanished) since it was read; nothing written
    Conflict,
}

/// Storage backend with compare-and-swap semantics.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Read the current record
    async fn load(&self, code: &GameCode) -> StoreResult<Option<Versioned<Game>>>;

    /// Store a brand-new record. Returns its version, or `None` if the code is taken.
    async fn insert_new(&self, game: &Game) -> StoreResult<Option<u64>>;

    /// Replace the record only if it is still at `expected_version`
    async fn compare_and_swap(
        &self,
        code: &GameCode,
        expected_version: u64,
        game: &Game,
    ) -> StoreResult<CasOutcome>;

    /// Remove the record only if it is still at `expected_version`
    async fn compare_and_delete(
        &self,
        code: &GameCode,
        expected_version: u64,
    ) -> StoreResult<CasOutcome>;

    /// Number of stored games
    async fn count(&self) -> StoreResult<usize>;
}
