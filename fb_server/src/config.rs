//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use family_bingo::{DatabaseConfig, GameRules};
use std::{net::SocketAddr, time::Duration};

/// Bind address used when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// PostgreSQL settings; `None` keeps games in memory
    pub database: Option<DatabaseConfig>,
    /// Economy applied to every game
    pub rules: GameRules,
    /// Period of automatic number calling; `None` means the host calls by hand
    pub auto_call: Option<Duration>,
    /// Prometheus listener address
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if an address variable cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(bind_override, database_url_override, |key| {
            std::env::var(key).ok()
        })
    }

    /// Same as [`from_env`](Self::from_env) with variables read through `lookup`.
    pub fn from_lookup<F>(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr(
                "SERVER_BIND",
                &lookup("SERVER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            )?,
        };

        let database = database_url_override
            .or_else(|| lookup("DATABASE_URL"))
            .filter(|url| !url.trim().is_empty())
            .map(|database_url| {
                let defaults = DatabaseConfig::with_url(database_url);
                DatabaseConfig {
                    max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections),
                    min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", defaults.min_connections),
                    connection_timeout_secs: parse_or(
                        &lookup,
                        "DB_CONNECTION_TIMEOUT",
                        defaults.connection_timeout_secs,
                    ),
                    idle_timeout_secs: parse_or(&lookup, "DB_IDLE_TIMEOUT", defaults.idle_timeout_secs),
                    max_lifetime_secs: parse_or(&lookup, "DB_MAX_LIFETIME", defaults.max_lifetime_secs),
                    ..defaults
                }
            });

        let defaults = GameRules::default();
        let rules = GameRules {
            initial_coins: parse_or(&lookup, "INITIAL_COINS", defaults.initial_coins),
            coin_award_match: parse_or(&lookup, "COIN_AWARD_MATCH", defaults.coin_award_match),
            manual_daub_cost: parse_or(&lookup, "MANUAL_DAUB_COST", defaults.manual_daub_cost),
            buy_card_cost: parse_or(&lookup, "BUY_CARD_COST", defaults.buy_card_cost),
            add_coins_amount: parse_or(&lookup, "ADD_COINS_AMOUNT", defaults.add_coins_amount),
            max_cards: parse_or(&lookup, "MAX_CARDS", defaults.max_cards),
        };

        let auto_call = match parse_or(&lookup, "AUTO_CALL_SECS", 0u64) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let metrics_bind = lookup("METRICS_BIND")
            .filter(|addr| !addr.trim().is_empty())
            .map(|addr| parse_addr("METRICS_BIND", &addr))
            .transpose()?;

        Ok(ServerConfig {
            bind,
            database,
            rules,
            auto_call,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.max_cards == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_CARDS".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        for (var, value) in [
            ("MANUAL_DAUB_COST", self.rules.manual_daub_cost),
            ("BUY_CARD_COST", self.rules.buy_card_cost),
            ("ADD_COINS_AMOUNT", self.rules.add_coins_amount),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
        }

        if let Some(database) = &self.database {
            database
                .validate()
                .map_err(|(setting, reason)| ConfigError::Invalid {
                    var: db_var(setting).to_string(),
                    reason,
                })?;
        }

        if let Some(metrics_bind) = self.metrics_bind
            && metrics_bind == self.bind
        {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        self.rules.validate().map_err(|reason| ConfigError::Invalid {
            var: "GAME_RULES".to_string(),
            reason,
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Environment variable behind a pool setting
fn db_var(setting: &str) -> &'static str {
    match setting {
        "max_connections" => "DB_MAX_CONNECTIONS",
        "min_connections" => "DB_MIN_CONNECTIONS",
        "connection_timeout_secs" => "DB_CONNECTION_TIMEOUT",
        "idle_timeout_secs" => "DB_IDLE_TIMEOUT",
        "max_lifetime_secs" => "DB_MAX_LIFETIME",
        _ => "DATABASE_URL",
    }
}

fn parse_addr(var: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("{value:?} is not an IP:PORT address"),
    })
}

/// Helper to parse a variable with default fallback
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
