//! In-memory device registry shared by the control plane and tick loop.
//!
//! The registry is the single owner of the per-device simulation state
//! (kind + last produced value). Both HTTP handlers (registration) and
//! the tick loop mutate it, so all access goes through a [`RwLock`];
//! the tick loop takes a [`snapshot`](DeviceRegistry::snapshot) under
//! the lock and then processes devices without holding it, so a
//! registration arriving mid-tick is neither dropped nor able to
//! corrupt the iteration -- it simply joins the next tick.

use std::collections::BTreeMap;

use fleetsim_types::DeviceKind;
use tokio::sync::RwLock;

/// Per-device in-memory simulation state.
///
/// Created when a device is registered or when the scheduler starts and
/// reloads the catalog; updated once per tick; never persisted (only
/// the successive values are, as readings).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationState {
    /// The device's sensor kind.
    pub kind: DeviceKind,
    /// The last simulated value.
    pub value: f64,
}

/// A point-in-time view of one registered device, as captured by
/// [`DeviceRegistry::snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    /// The device identifier.
    pub device_id: String,
    /// The device's sensor kind.
    pub kind: DeviceKind,
    /// The value at snapshot time.
    pub value: f64,
}

/// Shared in-memory mapping from device identifier to simulation state.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    inner: RwLock<BTreeMap<String, SimulationState>>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or reseed) a single device.
    pub async fn insert(&self, device_id: &str, kind: DeviceKind, value: f64) {
        let mut table = self.inner.write().await;
        table.insert(device_id.to_owned(), SimulationState { kind, value });
    }

    /// Replace the entire table with freshly seeded devices.
    ///
    /// Called by the scheduler on start after reloading the catalog.
    pub async fn replace_all(&self, devices: Vec<DeviceSnapshot>) {
        let mut table = self.inner.write().await;
        table.clear();
        for d in devices {
            table.insert(
                d.device_id,
                SimulationState {
                    kind: d.kind,
                    value: d.value,
                },
            );
        }
    }

    /// Capture the current device set.
    ///
    /// The lock is held only for the copy; callers process the snapshot
    /// without blocking registrations.
    pub async fn snapshot(&self) -> Vec<DeviceSnapshot> {
        let table = self.inner.read().await;
        table
            .iter()
            .map(|(id, state)| DeviceSnapshot {
                device_id: id.clone(),
                kind: state.kind,
                value: state.value,
            })
            .collect()
    }

    /// Update the cached value for a device.
    ///
    /// A no-op if the device is no longer present (e.g. the table was
    /// replaced between snapshot and update).
    pub async fn set_value(&self, device_id: &str, value: f64) {
        let mut table = self.inner.write().await;
        if let Some(state) = table.get_mut(device_id) {
            state.value = value;
        }
    }

    /// Look up a single device's state.
    pub async fn get(&self, device_id: &str) -> Option<SimulationState> {
        let table = self.inner.read().await;
        table.get(device_id).copied()
    }

    /// Number of devices currently in the table.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
