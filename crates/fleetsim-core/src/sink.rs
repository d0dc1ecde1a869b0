//! Persistence seams between the core and the data layer.
//!
//! The scheduler needs two things from storage: appending readings
//! ([`ReadingSink`]) and loading the device catalog on start
//! ([`DeviceCatalog`]). Both are dyn-safe async traits returning boxed
//! futures so the core stays free of SQL; `fleetsim-db` provides the
//! PostgreSQL implementations and the in-memory stubs here back the
//! scheduler tests.

use chrono::{DateTime, Utc};
use fleetsim_types::{Device, DeviceKind, Reading};
use futures::future::BoxFuture;

/// Errors surfaced through the persistence seams.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A reading insert failed.
    #[error("write error: {message}")]
    Write {
        /// Description of the failure.
        message: String,
    },

    /// A catalog operation failed.
    #[error("catalog error: {message}")]
    Catalog {
        /// Description of the failure.
        message: String,
    },
}

/// Append-only sink for readings.
///
/// One append call per device per tick. A failure for one device must
/// not abort the tick for others; each insert is its own atomic unit
/// and the caller isolates failures per device.
pub trait ReadingSink: Send + Sync {
    /// Append one reading to the kind's table.
    fn append<'a>(
        &'a self,
        kind: DeviceKind,
        device_id: &'a str,
        value: f64,
        at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// Read access to the persistent device catalog.
pub trait DeviceCatalog: Send + Sync {
    /// Load every registered device.
    fn load_all(&self) -> BoxFuture<'_, Result<Vec<Device>, SinkError>>;
}

// ---------------------------------------------------------------------------
// In-memory stubs for tests
// ---------------------------------------------------------------------------

/// In-memory [`ReadingSink`] capturing appends, with per-device
/// failure injection for exercising the drop-on-failure policy.
#[derive(Debug, Default)]
pub struct MemorySink {
    readings: tokio::sync::Mutex<Vec<(DeviceKind, Reading)>>,
    failing: tokio::sync::Mutex<std::collections::BTreeSet<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every append for the given device fail.
    pub async fn fail_device(&self, device_id: &str) {
        self.failing.lock().await.insert(device_id.to_owned());
    }

    /// All readings appended so far.
    pub async fn readings(&self) -> Vec<(DeviceKind, Reading)> {
        self.readings.lock().await.clone()
    }
}

impl ReadingSink for MemorySink {
    fn append<'a>(
        &'a self,
        kind: DeviceKind,
        device_id: &'a str,
        value: f64,
        at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            if self.failing.lock().await.contains(device_id) {
                return Err(SinkError::Write {
                    message: format!("injected failure for {device_id}"),
                });
            }
            self.readings.lock().await.push((
                kind,
                Reading {
                    device_id: device_id.to_owned(),
                    value,
                    at,
                },
            ));
            Ok(())
        })
    }
}

/// In-memory [`DeviceCatalog`] over a fixed device list.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    devices: tokio::sync::Mutex<Vec<Device>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device to the catalog.
    pub async fn add(&self, device_id: &str, name: &str, kind: DeviceKind) {
        self.devices.lock().await.push(Device {
            device_id: device_id.to_owned(),
            name: name.to_owned(),
            kind,
            registered_at: Utc::now(),
        });
    }
}

impl DeviceCatalog for MemoryCatalog {
    fn load_all(&self) -> BoxFuture<'_, Result<Vec<Device>, SinkError>> {
        Box::pin(async move { Ok(self.devices.lock().await.clone()) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sink_records_appends() {
        let sink = MemorySink::new();
        sink.append(DeviceKind::Wind, "w1", 5.0, Utc::now())
            .await
            .unwrap();

        let readings = sink.readings().await;
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].1.device_id, "w1");
    }

    #[tokio::test]
    async fn memory_sink_injected_failure() {
        let sink = MemorySink::new();
        sink.fail_device("w1").await;

        let result = sink.append(DeviceKind::Wind, "w1", 5.0, Utc::now()).await;
        assert!(result.is_err());
        assert!(sink.readings().await.is_empty());
    }

    #[tokio::test]
    async fn memory_catalog_loads_added_devices() {
        let catalog = MemoryCatalog::new();
        catalog.add("t1", "roof probe", DeviceKind::Temperature).await;

        let devices = catalog.load_all().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_id, "t1");
        assert_eq!(devices[0].kind, DeviceKind::Temperature);
    }
}
