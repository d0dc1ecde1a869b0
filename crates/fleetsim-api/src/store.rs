//! Storage seam between the HTTP handlers and the data layer.
//!
//! [`Storage`] is the handler-facing view of persistence: device
//! registration and listing, aggregate queries, and the schema
//! lifecycle driven by `/api/start` and `/api/dropall`. The production
//! implementation is [`PostgresStorage`]; [`MemoryStorage`] backs the
//! router integration tests.

use chrono::{DateTime, Utc};
use fleetsim_db::{CatalogStore, PostgresPool, ReadingStore};
use fleetsim_types::{Device, DeviceKind, Reading, ReadingStats};
use futures::future::BoxFuture;

/// A storage operation failed.
#[derive(Debug, thiserror::Error)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

/// Aggregate function selector for reading queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Smallest reading in the window.
    Min,
    /// Largest reading in the window.
    Max,
    /// Mean of the readings in the window.
    Avg,
}

/// Persistence operations required by the HTTP handlers.
pub trait Storage: Send + Sync {
    /// Atomically register a device; `None` when the identifier is
    /// already taken.
    fn register<'a>(
        &'a self,
        device: &'a Device,
    ) -> BoxFuture<'a, Result<Option<i32>, StorageError>>;

    /// Every registered device.
    fn devices(&self) -> BoxFuture<'_, Result<Vec<Device>, StorageError>>;

    /// One aggregate over a device's readings in an inclusive time
    /// window. `None` means no rows matched, not zero.
    fn aggregate<'a>(
        &'a self,
        agg: Aggregate,
        kind: DeviceKind,
        device_id: &'a str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<Option<f64>, StorageError>>;

    /// Minimum, maximum, and average over the same filtered set.
    fn stats<'a>(
        &'a self,
        kind: DeviceKind,
        device_id: &'a str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<ReadingStats, StorageError>>;

    /// Create the catalog and reading tables if missing.
    fn ensure_schema(&self) -> BoxFuture<'_, Result<(), StorageError>>;

    /// Destroy all reading tables.
    fn drop_readings(&self) -> BoxFuture<'_, Result<(), StorageError>>;
}

// ---------------------------------------------------------------------------
// PostgreSQL implementation
// ---------------------------------------------------------------------------

/// [`Storage`] backed by the PostgreSQL stores.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PostgresPool,
    catalog: CatalogStore,
    readings: ReadingStore,
}

impl PostgresStorage {
    /// Build the storage facade over a connected pool.
    pub fn new(pool: PostgresPool) -> Self {
        let catalog = CatalogStore::new(pool.pool().clone());
        let readings = ReadingStore::new(pool.pool().clone());
        Self {
            pool,
            catalog,
            readings,
        }
    }

    /// The underlying reading store, for wiring the scheduler sink.
    pub fn reading_store(&self) -> &ReadingStore {
        &self.readings
    }

    /// The underlying catalog store, for wiring the scheduler catalog.
    pub fn catalog_store(&self) -> &CatalogStore {
        &self.catalog
    }
}

fn storage_err(e: impl std::fmt::Display) -> StorageError {
    StorageError(e.to_string())
}

impl Storage for PostgresStorage {
    fn register<'a>(
        &'a self,
        device: &'a Device,
    ) -> BoxFuture<'a, Result<Option<i32>, StorageError>> {
        Box::pin(async move { self.catalog.insert(device).await.map_err(storage_err) })
    }

    fn devices(&self) -> BoxFuture<'_, Result<Vec<Device>, StorageError>> {
        Box::pin(async move { self.catalog.fetch_all().await.map_err(storage_err) })
    }

    fn aggregate<'a>(
        &'a self,
        agg: Aggregate,
        kind: DeviceKind,
        device_id: &'a str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<Option<f64>, StorageError>> {
        Box::pin(async move {
            let result = match agg {
                Aggregate::Min => self.readings.minimum(kind, device_id, start, end).await,
                Aggregate::Max => self.readings.maximum(kind, device_id, start, end).await,
                Aggregate::Avg => self.readings.average(kind, device_id, start, end).await,
            };
            result.map_err(storage_err)
        })
    }

    fn stats<'a>(
        &'a self,
        kind: DeviceKind,
        device_id: &'a str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<ReadingStats, StorageError>> {
        Box::pin(async move {
            self.readings
                .stats(kind, device_id, start, end)
                .await
                .map_err(storage_err)
        })
    }

    fn ensure_schema(&self) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            fleetsim_db::ensure_schema(self.pool.pool())
                .await
                .map_err(storage_err)
        })
    }

    fn drop_readings(&self) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            fleetsim_db::drop_readings(self.pool.pool())
                .await
                .map_err(storage_err)
        })
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation for tests
// ---------------------------------------------------------------------------

/// In-memory [`Storage`] over plain vectors.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    devices: tokio::sync::Mutex<Vec<Device>>,
    readings: tokio::sync::Mutex<Vec<(DeviceKind, Reading)>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading, as the tick loop would.
    pub async fn push_reading(&self, kind: DeviceKind, reading: Reading) {
        self.readings.lock().await.push((kind, reading));
    }

    async fn matching(
        &self,
        kind: DeviceKind,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<f64> {
        self.readings
            .lock()
            .await
            .iter()
            .filter(|(k, r)| {
                *k == kind && r.device_id == device_id && r.at >= start && r.at <= end
            })
            .map(|(_, r)| r.value)
            .collect()
    }
}

impl Storage for MemoryStorage {
    fn register<'a>(
        &'a self,
        device: &'a Device,
    ) -> BoxFuture<'a, Result<Option<i32>, StorageError>> {
        Box::pin(async move {
            let mut devices = self.devices.lock().await;
            if devices.iter().any(|d| d.device_id == device.device_id) {
                return Ok(None);
            }
            devices.push(device.clone());
            Ok(Some(i32::try_from(devices.len()).unwrap_or(i32::MAX)))
        })
    }

    fn devices(&self) -> BoxFuture<'_, Result<Vec<Device>, StorageError>> {
        Box::pin(async move { Ok(self.devices.lock().await.clone()) })
    }

    fn aggregate<'a>(
        &'a self,
        agg: Aggregate,
        kind: DeviceKind,
        device_id: &'a str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<Option<f64>, StorageError>> {
        Box::pin(async move {
            let values = self.matching(kind, device_id, start, end).await;
            if values.is_empty() {
                return Ok(None);
            }
            let result = match agg {
                Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
                Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                Aggregate::Avg => values.iter().sum::<f64>() / values.len() as f64,
            };
            Ok(Some(result))
        })
    }

    fn stats<'a>(
        &'a self,
        kind: DeviceKind,
        device_id: &'a str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<ReadingStats, StorageError>> {
        Box::pin(async move {
            Ok(ReadingStats {
                minimum: self
                    .aggregate(Aggregate::Min, kind, device_id, start, end)
                    .await?,
                maximum: self
                    .aggregate(Aggregate::Max, kind, device_id, start, end)
                    .await?,
                average: self
                    .aggregate(Aggregate::Avg, kind, device_id, start, end)
                    .await?,
            })
        })
    }

    fn ensure_schema(&self) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move { Ok(()) })
    }

    fn drop_readings(&self) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            self.readings.lock().await.clear();
            Ok(())
        })
    }
}
