//! Sensor reading persistence and aggregate queries.
//!
//! One table per device kind; all four share the same shape
//! (`device_id`, `sensor_value`, `time`). Aggregates return `None`
//! when no rows fall inside the requested window, which the API layer
//! surfaces as a JSON `null`.

use chrono::{DateTime, Utc};
use fleetsim_core::{ReadingSink, SinkError};
use fleetsim_types::{DeviceKind, ReadingStats};
use futures::future::BoxFuture;
use sqlx::PgPool;

use crate::error::DbError;
use crate::schema::reading_table;

/// Store for the per-kind reading tables.
#[derive(Debug, Clone)]
pub struct ReadingStore {
    pool: PgPool,
}

impl ReadingStore {
    /// Create a store over an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a single reading into the table for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure.
    pub async fn insert(
        &self,
        kind: DeviceKind,
        device_id: &str,
        value: f64,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO {} (device_id, sensor_value, time) VALUES ($1, $2, $3)",
            reading_table(kind)
        );
        sqlx::query(&sql)
            .bind(device_id)
            .bind(value)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn aggregate(
        &self,
        func: &str,
        kind: DeviceKind,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, DbError> {
        let sql = format!(
            "SELECT {func}(sensor_value) FROM {} WHERE device_id = $1 AND time BETWEEN $2 AND $3",
            reading_table(kind)
        );
        let value: Option<f64> = sqlx::query_scalar(&sql)
            .bind(device_id)
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await?;
        Ok(value)
    }

    /// Minimum reading for a device in a time window.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure.
    pub async fn minimum(
        &self,
        kind: DeviceKind,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, DbError> {
        self.aggregate("MIN", kind, device_id, start, end).await
    }

    /// Maximum reading for a device in a time window.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure.
    pub async fn maximum(
        &self,
        kind: DeviceKind,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, DbError> {
        self.aggregate("MAX", kind, device_id, start, end).await
    }

    /// Average reading for a device in a time window.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure.
    pub async fn average(
        &self,
        kind: DeviceKind,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, DbError> {
        self.aggregate("AVG", kind, device_id, start, end).await
    }

    /// Minimum, maximum, and average in one query.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure.
    pub async fn stats(
        &self,
        kind: DeviceKind,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ReadingStats, DbError> {
        let sql = format!(
            r"
            SELECT MIN(sensor_value), MAX(sensor_value), AVG(sensor_value)
            FROM {}
            WHERE device_id = $1 AND time BETWEEN $2 AND $3
            ",
            reading_table(kind)
        );
        let (minimum, maximum, average): (Option<f64>, Option<f64>, Option<f64>) =
            sqlx::query_as(&sql)
                .bind(device_id)
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await?;
        Ok(ReadingStats {
            minimum,
            maximum,
            average,
        })
    }
}

impl ReadingSink for ReadingStore {
    fn append<'a>(
        &'a self,
        kind: DeviceKind,
        device_id: &'a str,
        value: f64,
        at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            self.insert(kind, device_id, value, at)
                .await
                .map_err(|e| SinkError::Write {
                    message: e.to_string(),
                })
        })
    }
}
