//! Connection pool settings.

use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Default pool sizing around `database_url`.
    ///
    /// A bingo night is a handful of games with a few players each, so the
    /// pool stays small.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }

    /// Local development database (`postgres://postgres@localhost/bingo_db`)
    pub fn development() -> Self {
        Self::with_url("postgres://postgres@localhost/bingo_db")
    }

    /// Pool bounds check. The error names the offending setting.
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        if self.max_connections == 0 {
            return Err(("max_connections", "Must be greater than 0".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err((
                "min_connections",
                format!("Cannot exceed max connections ({})", self.max_connections),
            ));
        }

        if self.connection_timeout_secs == 0 {
            return Err((
                "connection_timeout_secs",
                "Must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub(crate) fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}
