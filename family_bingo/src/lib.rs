//! # Family Bingo
//!
//! A real-time multiplayer bingo engine: a host calls numbers, players mark
//! matching cells on random 5x5 cards, and the first completed row, column or
//! diagonal wins.
//!
//! ## Architecture
//!
//! One shared record per game holds everything: status, players with their
//! cards and coins, called numbers and the winner. Hosts and players never
//! talk to each other; every change is an atomic read-modify-write on that
//! record, and every committed version is pushed to subscribers.
//!
//! A game moves through three states:
//!
//! - **Waiting**: lobby, players join and receive their first card
//! - **Playing**: the host calls numbers; players earn coins, buy cards, daub
//! - **Ended**: a winner was declared or the host ended the game
//!
//! ## Core Modules
//!
//! - [`game`]: data model, card generation, win detection, rules
//! - [`store`]: versioned storage with compare-and-swap (memory, PostgreSQL)
//! - [`service`]: the mutation protocol and the subscription hub
//! - [`session`]: host and player flows driven by snapshots
//! - [`identity`], [`commentary`]: external collaborators
//!
//! ## Example
//!
//! ```
//! use family_bingo::{GameService, GameStatus, PlayerId};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = GameService::in_memory();
//!     let code = service.create_game(&PlayerId::new("host")).await.unwrap();
//!
//!     let game = service.get_game(&code).await.unwrap();
//!     assert_eq!(game.status, GameStatus::Waiting);
//! }
//! ```

/// Rules engine: entities, cards, evaluation.
pub mod game;
pub use game::{
    BingoCard, Cell, ErrorKind, Game, GameCode, GameError, GameResult, GameRules, GameStatus,
    LeaderboardEntry, Player, PlayerId,
    constants::{self, MAX_NUMBER},
    generate_card,
};

/// Game storage backends.
pub mod store;
pub use store::{GameStore, MemoryGameStore, PgGameStore, StoreError, StoreResult};

/// Database connection management.
pub mod db;
pub use db::{Database, DatabaseConfig};

/// Atomic mutations and change propagation.
pub mod service;
pub use service::{
    GameService, GameUpdate, JoinOutcome, MarkOutcome, PlayerUpdate, Subscription,
    SubscriptionHandle, WinOutcome,
};

pub mod session;
pub use session::{CallingStopped, HostSession, PlayerSession, SessionEnd};

pub mod commentary;
pub mod identity;
