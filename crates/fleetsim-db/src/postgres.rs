//! PostgreSQL connection pool management.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time
//! checked) so no live database is required at build time. All queries
//! are parameterized; the only interpolated fragments are the static
//! per-kind table names.

use std::time::Duration;

use fleetsim_core::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::error::DbError;

/// Connection acquire timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle connection timeout.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection pool handle to PostgreSQL.
///
/// Wraps a [`sqlx::PgPool`]; the catalog and reading stores each hold
/// a clone of the inner pool.
#[derive(Debug, Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Connect to PostgreSQL using the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed, or
    /// [`DbError::Postgres`] if the connection fails.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        let connect_options: PgConnectOptions = config
            .url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("Invalid database URL: {e}")))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(CONNECT_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .connect_with(connect_options)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );

        Ok(Self { pool })
    }

    /// Connect using a database URL string with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection fails.
    pub async fn connect_url(url: &str) -> Result<Self, DbError> {
        let config = DatabaseConfig {
            url: url.to_owned(),
            ..DatabaseConfig::default()
        };
        Self::connect(&config).await
    }

    /// Return a reference to the underlying [`PgPool`].
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
    }
}
