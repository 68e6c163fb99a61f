//! Game service: the atomic mutation protocol and change propagation.
//!
//! This module implements:
//! - GameService: every lifecycle operation as an optimistic read-modify-write
//! - SubscriptionHub: per-game fan-out of committed snapshots
//! - Outcome and update types returned to callers
//!
//! ## Architecture
//!
//! Host and players never talk to each other directly. Each of them calls
//! into the shared `GameService`, which re-reads the record, applies one
//! change, validates it and commits it with a compare-and-swap. Conflicting
//! writers retry on the fresher copy. Every commit is then pushed to all
//! subscribers of that game in version order.
//!
//! ## Example
//!
//! ```
//! use family_bingo::{GameService, PlayerId};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = GameService::in_memory();
//!     let host = PlayerId::new("host");
//!     let code = service.create_game(&host).await.unwrap();
//!
//!     service.join_game(&code, &PlayerId::new("p1"), "Ada").await.unwrap();
//!     let first = service.start_game(&code).await.unwrap();
//!     assert!(first.is_some());
//! }
//! ```

pub mod hub;
pub mod manager;
pub mod messages;

pub use hub::{GameUpdate, SubscriberId, Subscription, SubscriptionHandle, SubscriptionHub};
pub use manager::{GameService, MAX_CODE_ATTEMPTS, MAX_TRANSACTION_ATTEMPTS};
pub use messages::{JoinOutcome, MarkOutcome, PlayerUpdate, WinOutcome};
