//! Structured logging setup.
//!
//! The library crate logs through the `log` facade; the subscriber installed
//! here also captures those records, so game events and request logs end up
//! in one stream.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Install the global subscriber. `RUST_LOG` overrides [`DEFAULT_FILTER`].
///
/// Panics if a subscriber is already installed, so call it once from `main`.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    tracing::debug!(filter = DEFAULT_FILTER, "logging ready");
}

/// One line per finished request, at error level for 5xx responses.
///
/// `route` is the matched route template (`/api/v1/games/{code}`), or the
/// raw path when nothing matched.
pub fn log_api_request(request_id: &str, method: &str, route: &str, status: u16, elapsed_ms: u64) {
    if status >= 500 {
        tracing::error!(%request_id, %method, %route, status, elapsed_ms, "request failed");
    } else {
        tracing::info!(%request_id, %method, %route, status, elapsed_ms, "request served");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_request_lines_without_subscriber() {
        log_api_request("id-1", "GET", "/api/v1/games/{code}", 200, 4);
        log_api_request("id-2", "POST", "/api/v1/games", 500, 1200);
    }
}
