//! Fleetsim server binary.
//!
//! Wires together the PostgreSQL data layer, the tick scheduler, and
//! the HTTP/WebSocket API into a single process.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `fleetsim.yaml`
//! 3. Connect to PostgreSQL and ensure the schema exists
//! 4. Assemble the scheduler with the PostgreSQL stores
//! 5. Spawn the debug broadcaster when enabled
//! 6. Serve the API until the process is terminated

use std::path::Path;
use std::sync::Arc;

use fleetsim_api::{start_server, AppState, PostgresStorage};
use fleetsim_core::config::FleetsimConfig;
use fleetsim_core::{ControlState, DeviceRegistry, Scheduler, ThreadWalkRng};
use fleetsim_db::PostgresPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration loading, the database
/// connection, or the HTTP server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("fleetsim-server starting");

    // 2. Load configuration.
    let mut config = load_config()?;
    config.database.apply_env_overrides();
    info!(
        host = config.server.host,
        port = config.server.port,
        tick_interval_ms = config.simulation.tick_interval_ms,
        max_ticks = config.simulation.max_ticks,
        "Configuration loaded"
    );

    // 3. Connect to PostgreSQL and ensure the schema exists.
    let pool = PostgresPool::connect(&config.database).await?;
    fleetsim_db::ensure_schema(pool.pool()).await?;
    info!("Database ready");

    // 4. Assemble the scheduler with the PostgreSQL stores.
    let storage = PostgresStorage::new(pool);
    let scheduler = Scheduler::new(
        Arc::new(DeviceRegistry::new()),
        Arc::new(ControlState::new(
            config.simulation.tick_interval_ms,
            config.simulation.max_ticks,
        )),
        Arc::new(storage.reading_store().clone()),
        Arc::new(storage.catalog_store().clone()),
        Box::new(ThreadWalkRng::new()),
    );

    let state = Arc::new(AppState::new(scheduler, Arc::new(storage)));

    // 5. Spawn the debug broadcaster when enabled.
    if config.debug.random_broadcast {
        let _broadcaster = fleetsim_api::debug::spawn_random_broadcast(
            Arc::clone(&state),
            config.debug.broadcast_interval_ms,
        );
    }

    // 6. Serve the API until the process is terminated.
    start_server(&config.server, state).await?;

    Ok(())
}

/// Load configuration from `fleetsim.yaml`, falling back to defaults
/// when the file does not exist.
fn load_config() -> Result<FleetsimConfig, fleetsim_core::ConfigError> {
    let config_path = Path::new("fleetsim.yaml");
    if config_path.exists() {
        FleetsimConfig::from_file(config_path)
    } else {
        info!("Config file not found, using defaults");
        Ok(FleetsimConfig::default())
    }
}
