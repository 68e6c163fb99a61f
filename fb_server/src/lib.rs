//! HTTP and WebSocket front end for family bingo games.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
