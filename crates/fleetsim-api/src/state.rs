//! Shared application state for the API server.

use std::sync::Arc;

use fleetsim_core::Scheduler;
use tokio::sync::broadcast;

use crate::store::Storage;

/// Capacity of the debug broadcast channel.
///
/// A subscriber that falls behind by more than this many messages
/// receives a lag error and skips to the newest message.
const DEBUG_CHANNEL_CAPACITY: usize = 16;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. Tick
/// batches flow from the scheduler's own broadcast channel; the
/// separate `debug_tx` channel carries the diagnostic random-number
/// stream when that mode is enabled.
#[derive(Clone)]
pub struct AppState {
    /// Simulation scheduler and device registry.
    pub scheduler: Scheduler,
    /// Persistence operations for handlers.
    pub storage: Arc<dyn Storage>,
    /// Sender for the debug random-number broadcast.
    pub debug_tx: broadcast::Sender<i64>,
}

impl AppState {
    /// Create the application state.
    pub fn new(scheduler: Scheduler, storage: Arc<dyn Storage>) -> Self {
        let (debug_tx, _) = broadcast::channel(DEBUG_CHANNEL_CAPACITY);
        Self {
            scheduler,
            storage,
            debug_tx,
        }
    }
}
