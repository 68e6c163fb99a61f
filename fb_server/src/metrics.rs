//! Prometheus metrics for monitoring the bingo server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! (`METRICS_BIND`). Without that listener no recorder is installed and
//! every function here is a no-op.
//!
//! Every series is prefixed with `bingo_`.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

/// Count a finished request and record how long it took.
pub fn http_request(method: &str, route: &str, status: u16, duration_ms: f64) {
    let method = method.to_string();
    let route = route.to_string();

    metrics::counter!("bingo_http_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("bingo_http_request_duration_ms", "method" => method, "route" => route)
        .record(duration_ms);
}

/// Snapshot feeds currently open, across all games.
pub fn feeds_open(count: usize) {
    metrics::gauge!("bingo_feeds_open").set(count as f64);
}

pub fn feed_opened() {
    metrics::counter!("bingo_feeds_opened_total").increment(1);
}

/// A snapshot or not-found signal pushed down a feed.
pub fn feed_message_pushed() {
    metrics::counter!("bingo_feed_messages_total").increment(1);
}

pub fn games_stored(count: usize) {
    metrics::gauge!("bingo_games_stored").set(count as f64);
}

pub fn game_created() {
    metrics::counter!("bingo_games_created_total").increment(1);
}

pub fn number_called() {
    metrics::counter!("bingo_numbers_called_total").increment(1);
}

/// `claim` for an explicit claim, `manual_mark` when a paid daub completed the line.
pub fn game_won(via: &'static str) {
    metrics::counter!("bingo_games_won_total", "via" => via).increment(1);
}

pub fn session_issued() {
    metrics::counter!("bingo_sessions_issued_total").increment(1);
}
