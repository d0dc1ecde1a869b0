//! Device catalog persistence.

use chrono::{DateTime, Utc};
use fleetsim_core::{DeviceCatalog, SinkError};
use fleetsim_types::{Device, DeviceKind};
use futures::future::BoxFuture;
use sqlx::PgPool;

use crate::error::DbError;

/// Raw catalog row as stored in the `devices` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeviceRow {
    /// Surrogate primary key.
    pub id: i32,
    /// Caller-assigned device identifier, unique across the fleet.
    pub device_id: String,
    /// Human-readable device name.
    pub name: String,
    /// Device kind as stored text.
    pub kind: String,
    /// Registration timestamp.
    pub registered_at: DateTime<Utc>,
}

impl DeviceRow {
    fn into_device(self) -> Result<Device, DbError> {
        let kind = self
            .kind
            .parse::<DeviceKind>()
            .map_err(|source| DbError::CorruptKind {
                device_id: self.device_id.clone(),
                source,
            })?;
        Ok(Device {
            device_id: self.device_id,
            name: self.name,
            kind,
            registered_at: self.registered_at,
        })
    }
}

/// Store for the device catalog table.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    /// Create a store over an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a device, returning its row id, or `None` when the
    /// `device_id` is already registered.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure.
    pub async fn insert(&self, device: &Device) -> Result<Option<i32>, DbError> {
        let id: Option<i32> = sqlx::query_scalar(
            r"
            INSERT INTO devices (device_id, name, kind, registered_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (device_id) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&device.device_id)
        .bind(&device.name)
        .bind(device.kind.as_str())
        .bind(device.registered_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    /// Fetch every registered device, ordered by row id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure, or
    /// [`DbError::CorruptKind`] if a stored kind no longer parses.
    pub async fn fetch_all(&self) -> Result<Vec<Device>, DbError> {
        let rows: Vec<DeviceRow> =
            sqlx::query_as("SELECT id, device_id, name, kind, registered_at FROM devices ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(DeviceRow::into_device).collect()
    }
}

impl DeviceCatalog for CatalogStore {
    fn load_all(&self) -> BoxFuture<'_, Result<Vec<Device>, SinkError>> {
        Box::pin(async move {
            self.fetch_all().await.map_err(|e| SinkError::Catalog {
                message: e.to_string(),
            })
        })
    }
}
