//! Diagnostic random-number broadcast.
//!
//! When `debug.random_broadcast` is enabled in the configuration, this
//! task emits a random integer over the `WebSocket` at a fixed
//! interval. It exists for exercising clients without a database or a
//! running simulation and is disabled by default.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::AppState;

/// Spawn the random-number broadcaster. Runs until the process exits.
pub fn spawn_random_broadcast(state: Arc<AppState>, interval_ms: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(interval_ms, "Debug random broadcast enabled");
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
        loop {
            ticker.tick().await;
            let number = rand::rng().random_range(1..=100);
            // send fails only with zero subscribers, which is normal.
            let _ = state.debug_tx.send(number);
        }
    })
}
