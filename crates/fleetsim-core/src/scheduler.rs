//! Tick scheduler: the periodic simulate -> persist -> broadcast loop.
//!
//! The [`Scheduler`] drives the whole simulation. On `start` it reloads
//! the device catalog, reseeds the registry, and spawns the tick loop
//! on a background task; on `stop` it signals the loop, which exits
//! after completing any in-flight tick. Both transitions are idempotent
//! no-ops when the state machine is already in the target state.
//!
//! Each tick the loop snapshots the registry (lock held only for the
//! copy), advances every device's random walk, persists each reading,
//! updates the cached value, and publishes the per-tick [`TickBatch`]
//! on a bounded broadcast channel. A persistence failure for one device
//! drops that device's reading for the tick and continues with the
//! rest.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleetsim_types::{Reading, TickBatch};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::control::{ControlState, SchedulerStatus};
use crate::registry::{DeviceRegistry, DeviceSnapshot};
use crate::sink::{DeviceCatalog, ReadingSink, SinkError};
use crate::walk::{self, WalkRng};

/// Capacity of the batch broadcast channel.
///
/// A subscriber that falls behind by more than this many batches
/// lag-skips to the newest one; it never blocks the publisher.
const BROADCAST_CAPACITY: usize = 64;

/// Errors that can occur in scheduler lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Loading the device catalog on start failed.
    #[error("catalog load failed: {source}")]
    CatalogLoad {
        /// The underlying sink error.
        #[from]
        source: SinkError,
    },
}

/// Outcome of a `start` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The scheduler was stopped and is now running.
    Started {
        /// Number of devices loaded from the catalog.
        devices: usize,
    },
    /// The scheduler was already running; nothing changed.
    AlreadyRunning,
}

/// Outcome of a `stop` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A stop was signalled; the in-flight tick (if any) completes
    /// and no new tick begins.
    Stopping,
    /// The scheduler was not running; nothing changed.
    NotRunning,
}

/// The tick scheduler.
///
/// Cheap to share: all fields are `Arc`s. One instance lives in the
/// API state and is used by the start/check/end handlers as well as
/// device registration (for seeding).
#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<DeviceRegistry>,
    control: Arc<ControlState>,
    sink: Arc<dyn ReadingSink>,
    catalog: Arc<dyn DeviceCatalog>,
    batches: broadcast::Sender<TickBatch>,
    rng: Arc<Mutex<Box<dyn WalkRng>>>,
}

impl Scheduler {
    /// Assemble a scheduler from its collaborators.
    pub fn new(
        registry: Arc<DeviceRegistry>,
        control: Arc<ControlState>,
        sink: Arc<dyn ReadingSink>,
        catalog: Arc<dyn DeviceCatalog>,
        rng: Box<dyn WalkRng>,
    ) -> Self {
        let (batches, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            registry,
            control,
            sink,
            catalog,
            batches,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// The shared device registry.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Subscribe to per-tick batches.
    ///
    /// Subscribers connected after a publish do not receive past
    /// batches; there is no replay.
    pub fn subscribe(&self) -> broadcast::Receiver<TickBatch> {
        self.batches.subscribe()
    }

    /// Draw a seed value for a freshly registered device.
    pub async fn seed_value(&self, kind: fleetsim_types::DeviceKind) -> f64 {
        self.rng.lock().await.seed_value(kind)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SchedulerStatus {
        self.control.status()
    }

    /// `Stopped -> Running`: reload the catalog, reseed the registry,
    /// and launch the tick loop.
    ///
    /// A no-op reporting [`StartOutcome::AlreadyRunning`] if the loop
    /// is already running.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::CatalogLoad`] if the catalog cannot be
    /// read; the scheduler returns to `Stopped` in that case.
    pub async fn start(&self) -> Result<StartOutcome, SchedulerError> {
        if !self.control.try_begin_run() {
            debug!("start requested while already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let devices = match self.catalog.load_all().await {
            Ok(devices) => devices,
            Err(e) => {
                self.control.finish_run();
                return Err(e.into());
            }
        };

        let mut seeded = Vec::with_capacity(devices.len());
        {
            let mut rng = self.rng.lock().await;
            for device in devices {
                let value = rng.seed_value(device.kind);
                seeded.push(DeviceSnapshot {
                    device_id: device.device_id,
                    kind: device.kind,
                    value,
                });
            }
        }
        let count = seeded.len();
        self.registry.replace_all(seeded).await;

        info!(
            devices = count,
            tick_interval_ms = self.control.tick_interval_ms(),
            max_ticks = self.control.max_ticks(),
            "Scheduler starting"
        );

        let registry = Arc::clone(&self.registry);
        let control = Arc::clone(&self.control);
        let sink = Arc::clone(&self.sink);
        let rng = Arc::clone(&self.rng);
        let batches = self.batches.clone();
        tokio::spawn(async move {
            run_tick_loop(&registry, &control, sink.as_ref(), &rng, &batches).await;
        });

        Ok(StartOutcome::Started { devices: count })
    }

    /// `Running -> Stopped`: signal the tick loop to exit.
    ///
    /// The in-flight tick (if any) completes and publishes; no new tick
    /// begins. A no-op reporting [`StopOutcome::NotRunning`] if already
    /// stopped.
    pub fn stop(&self) -> StopOutcome {
        if !self.control.is_running() {
            debug!("stop requested while not running");
            return StopOutcome::NotRunning;
        }
        self.control.request_stop();
        info!("Scheduler stop requested");
        StopOutcome::Stopping
    }
}

/// The tick loop body, run on a background task until stopped.
async fn run_tick_loop(
    registry: &DeviceRegistry,
    control: &ControlState,
    sink: &dyn ReadingSink,
    rng: &Mutex<Box<dyn WalkRng>>,
    batches: &broadcast::Sender<TickBatch>,
) {
    loop {
        if control.is_stop_requested() {
            break;
        }

        let batch = run_tick(registry, control, sink, rng).await;
        // send fails only with zero receivers, which is normal when no
        // push clients are connected.
        let receivers = batches.send(batch.clone()).unwrap_or(0);
        debug!(
            tick = batch.tick,
            readings = batch.len(),
            receivers,
            "Tick published"
        );

        if control.tick_limit_reached(batch.tick) {
            info!(
                tick = batch.tick,
                max_ticks = control.max_ticks(),
                "Tick limit reached, auto-stopping"
            );
            break;
        }
        if control.is_stop_requested() {
            break;
        }

        // Race the inter-tick sleep against the stop signal so a stop
        // takes effect within one tick period. A stale notify permit
        // from a previous run at worst shortens one sleep; the
        // stop_requested check above remains authoritative.
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(control.tick_interval_ms())) => {}
            () = control.stop_signalled() => {}
        }
    }

    control.finish_run();
    info!(ticks = control.ticks_completed(), "Scheduler stopped");
}

/// Execute one tick: walk, persist, and collect every device's reading.
///
/// Persistence must complete (or fail) for a device before its value is
/// surfaced: a failed write drops that device's reading for this tick
/// and leaves its cached value unchanged.
async fn run_tick(
    registry: &DeviceRegistry,
    control: &ControlState,
    sink: &dyn ReadingSink,
    rng: &Mutex<Box<dyn WalkRng>>,
) -> TickBatch {
    let devices = registry.snapshot().await;
    let now = Utc::now();
    let tick = control.record_tick();
    let mut batch = TickBatch::new(tick, now);

    for device in devices {
        let draw = { rng.lock().await.draw() };
        let next = walk::step(device.kind, device.value, draw);

        match sink.append(device.kind, &device.device_id, next, now).await {
            Ok(()) => {
                registry.set_value(&device.device_id, next).await;
                batch.push(
                    device.kind,
                    Reading {
                        device_id: device.device_id,
                        value: next,
                        at: now,
                    },
                );
            }
            Err(e) => {
                warn!(
                    device_id = %device.device_id,
                    kind = %device.kind,
                    error = %e,
                    "Reading dropped: persist failed"
                );
            }
        }
    }

    batch
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleetsim_types::DeviceKind;

    use super::*;
    use crate::sink::{MemoryCatalog, MemorySink};
    use crate::walk::ScriptedWalkRng;

    fn make_scheduler(
        sink: Arc<MemorySink>,
        catalog: Arc<MemoryCatalog>,
        rng: Box<dyn WalkRng>,
        tick_interval_ms: u64,
        max_ticks: u64,
    ) -> Scheduler {
        Scheduler::new(
            Arc::new(DeviceRegistry::new()),
            Arc::new(ControlState::new(tick_interval_ms, max_ticks)),
            sink,
            catalog,
            rng,
        )
    }

    async fn wait_until_stopped(scheduler: &Scheduler) {
        for _ in 0..200 {
            if !scheduler.status().running {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!scheduler.status().running, "scheduler never stopped");
    }

    #[tokio::test]
    async fn start_loads_catalog_and_ticks_every_device() {
        let sink = Arc::new(MemorySink::new());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add("t1", "roof", DeviceKind::Temperature).await;
        catalog.add("h1", "cellar", DeviceKind::Humidity).await;

        let rng = Box::new(ScriptedWalkRng::new(vec![9, 9], 28.0));
        let scheduler = make_scheduler(Arc::clone(&sink), catalog, rng, 10, 1);

        let mut rx = scheduler.subscribe();
        let outcome = scheduler.start().await.unwrap();
        assert_eq!(outcome, StartOutcome::Started { devices: 2 });

        // Exactly one batch (max_ticks = 1) containing both devices.
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.tick, 1);
        assert_eq!(batch.len(), 2);

        wait_until_stopped(&scheduler).await;
        assert_eq!(sink.readings().await.len(), 2);
    }

    #[tokio::test]
    async fn start_while_running_is_noop() {
        let sink = Arc::new(MemorySink::new());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add("t1", "roof", DeviceKind::Temperature).await;

        let rng = Box::new(ScriptedWalkRng::new(Vec::new(), 28.0));
        // Long interval so the loop stays alive during the second start.
        let scheduler = make_scheduler(sink, catalog, rng, 60_000, 0);

        let first = scheduler.start().await.unwrap();
        assert!(matches!(first, StartOutcome::Started { .. }));
        let second = scheduler.start().await.unwrap();
        assert_eq!(second, StartOutcome::AlreadyRunning);

        let _ = scheduler.stop();
        wait_until_stopped(&scheduler).await;
    }

    #[tokio::test]
    async fn stop_while_stopped_is_noop() {
        let sink = Arc::new(MemorySink::new());
        let catalog = Arc::new(MemoryCatalog::new());
        let rng = Box::new(ScriptedWalkRng::new(Vec::new(), 0.0));
        let scheduler = make_scheduler(sink, catalog, rng, 10, 0);

        assert_eq!(scheduler.stop(), StopOutcome::NotRunning);
    }

    #[tokio::test]
    async fn scripted_draws_raise_temperature_by_tenths() {
        let sink = Arc::new(MemorySink::new());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add("t1", "roof", DeviceKind::Temperature).await;

        // Seed 28.0; draws 9,9,9 move the walk up 0.1 per tick.
        let rng = Box::new(ScriptedWalkRng::new(vec![9, 9, 9], 28.0));
        let scheduler = make_scheduler(Arc::clone(&sink), catalog, rng, 1, 3);

        let _ = scheduler.start().await.unwrap();
        wait_until_stopped(&scheduler).await;

        let readings = sink.readings().await;
        assert_eq!(readings.len(), 3);
        let values: Vec<f64> = readings.iter().map(|(_, r)| r.value).collect();
        assert!((values[0] - 28.1).abs() < 1e-9);
        assert!((values[1] - 28.2).abs() < 1e-9);
        assert!((values[2] - 28.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn walk_clamps_at_upper_bound_across_ticks() {
        let sink = Arc::new(MemorySink::new());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add("t1", "roof", DeviceKind::Temperature).await;

        // Seed at the bound; every draw pushes up but the clamp holds.
        let rng = Box::new(ScriptedWalkRng::new(vec![10, 10, 10], 32.0));
        let scheduler = make_scheduler(Arc::clone(&sink), catalog, rng, 1, 3);

        let _ = scheduler.start().await.unwrap();
        wait_until_stopped(&scheduler).await;

        for (_, reading) in sink.readings().await {
            assert!((reading.value - 32.0).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn write_failure_drops_device_but_not_tick() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_device("h1").await;
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add("t1", "roof", DeviceKind::Temperature).await;
        catalog.add("h1", "cellar", DeviceKind::Humidity).await;

        let rng = Box::new(ScriptedWalkRng::new(vec![1, 1], 30.0));
        let scheduler = make_scheduler(Arc::clone(&sink), catalog, rng, 1, 1);

        let mut rx = scheduler.subscribe();
        let _ = scheduler.start().await.unwrap();

        let batch = rx.recv().await.unwrap();
        // The failing device's reading is dropped from both the sink
        // and the published batch; the healthy device proceeds.
        assert_eq!(batch.len(), 1);
        assert!(batch.readings.contains_key(&DeviceKind::Temperature));

        wait_until_stopped(&scheduler).await;
        assert_eq!(sink.readings().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_write_leaves_cached_value_unchanged() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_device("t1").await;
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add("t1", "roof", DeviceKind::Temperature).await;

        let rng = Box::new(ScriptedWalkRng::new(vec![9], 28.0));
        let scheduler = make_scheduler(sink, catalog, rng, 1, 1);

        let _ = scheduler.start().await.unwrap();
        wait_until_stopped(&scheduler).await;

        let state = scheduler.registry().get("t1").await.unwrap();
        assert!((state.value - 28.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stop_completes_in_flight_tick_then_halts() {
        let sink = Arc::new(MemorySink::new());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add("t1", "roof", DeviceKind::Temperature).await;

        let rng = Box::new(ScriptedWalkRng::new(Vec::new(), 28.0));
        // Long interval: without the stop signal the second tick would
        // be a minute away.
        let scheduler = make_scheduler(Arc::clone(&sink), catalog, rng, 60_000, 0);

        let mut rx = scheduler.subscribe();
        let _ = scheduler.start().await.unwrap();

        // First tick publishes.
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.tick, 1);

        assert_eq!(scheduler.stop(), StopOutcome::Stopping);
        wait_until_stopped(&scheduler).await;

        // No further ticks occurred.
        assert_eq!(scheduler.status().ticks_completed, 1);
        assert_eq!(sink.readings().await.len(), 1);
    }

    #[tokio::test]
    async fn device_registered_mid_run_joins_next_tick() {
        let sink = Arc::new(MemorySink::new());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add("t1", "roof", DeviceKind::Temperature).await;

        let rng = Box::new(ScriptedWalkRng::new(Vec::new(), 28.0));
        let scheduler = make_scheduler(Arc::clone(&sink), catalog, rng, 20, 2);

        let mut rx = scheduler.subscribe();
        let _ = scheduler.start().await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.len(), 1);

        // Register a second device between ticks, as the control plane
        // does after a successful catalog insert.
        scheduler
            .registry()
            .insert("w1", DeviceKind::Wind, 5.0)
            .await;

        let second = rx.recv().await.unwrap();
        assert_eq!(second.len(), 2);

        wait_until_stopped(&scheduler).await;
    }

    #[tokio::test]
    async fn restart_reseeds_from_catalog() {
        let sink = Arc::new(MemorySink::new());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add("t1", "roof", DeviceKind::Temperature).await;

        let rng = Box::new(ScriptedWalkRng::new(vec![9, 9], 30.0));
        let scheduler = make_scheduler(sink, catalog, rng, 1, 1);

        let _ = scheduler.start().await.unwrap();
        wait_until_stopped(&scheduler).await;

        // Second run reloads and reseeds; the walk restarts from the
        // scripted seed, not the last cached value.
        let _ = scheduler.start().await.unwrap();
        wait_until_stopped(&scheduler).await;

        let state = scheduler.registry().get("t1").await.unwrap();
        assert!((state.value - 30.1).abs() < 1e-9);
    }
}
