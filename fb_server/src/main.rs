//! Family bingo server.
//!
//! Serves the game API and snapshot feeds over one `GameService`, backed by
//! PostgreSQL when `DATABASE_URL` is set and by memory otherwise.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Error, anyhow};
use family_bingo::{Database, GameService, GameStore, MemoryGameStore};
use fb_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use log::{error, info};
use pico_args::Arguments;

const HELP: &str = "\
Run a family bingo server

USAGE:
  fb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL, or keep games in memory]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  AUTO_CALL_SECS           Seconds between automatic calls, 0 for manual calling
  METRICS_BIND             Prometheus listener address (e.g., 127.0.0.1:9090)
  INITIAL_COINS, BUY_CARD_COST, MANUAL_DAUB_COST,
  ADD_COINS_AMOUNT, COIN_AWARD_MATCH, MAX_CARDS
                           Game economy overrides
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url)?;
    config.validate()?;
    info!("Starting family bingo server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow!(e))?;
        info!("Prometheus metrics at http://{}/metrics", addr);
    }

    let (store, database): (Arc<dyn GameStore>, Option<Arc<Database>>) = match &config.database {
        Some(db_config) => {
            info!("Connecting to database");
            let db = Database::connect(db_config)
                .await
                .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;
            info!("Database connected successfully");

            let store: Arc<dyn GameStore> = Arc::new(db.game_store());
            (store, Some(Arc::new(db)))
        }
        None => {
            info!("No DATABASE_URL set, games are kept in memory");
            let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
            (store, None)
        }
    };

    if let Some(period) = config.auto_call {
        info!("Numbers are called automatically every {:?}", period);
    }

    let state = AppState {
        service: GameService::new(store, config.rules),
        database: database.clone(),
        auto_call: config.auto_call,
        commentary: None,
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
