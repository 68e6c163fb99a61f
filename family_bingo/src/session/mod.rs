//! Headless host and player flows built on [`GameService`](crate::service::GameService).

pub mod host;
pub mod player;

pub use host::{CallingStopped, HostSession};
pub use player::{PlayerSession, SessionEnd};
