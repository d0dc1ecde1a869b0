//! Idempotent schema management.
//!
//! The reading tables are destroyed by the dropall operation and
//! recreated on the next simulation start, so all DDL here uses
//! `IF NOT EXISTS` / `IF EXISTS` and can run at any point in the
//! application lifecycle.

use fleetsim_types::DeviceKind;
use sqlx::PgPool;

use crate::error::DbError;

/// Device catalog table.
const CREATE_DEVICES: &str = r"
    CREATE TABLE IF NOT EXISTS devices (
        id            SERIAL PRIMARY KEY,
        device_id     TEXT NOT NULL UNIQUE,
        name          TEXT NOT NULL,
        kind          TEXT NOT NULL,
        registered_at TIMESTAMPTZ NOT NULL
    )
";

/// Reading table name for a device kind.
pub(crate) const fn reading_table(kind: DeviceKind) -> &'static str {
    match kind {
        DeviceKind::Temperature => "temperatures",
        DeviceKind::Humidity => "humidities",
        DeviceKind::Wind => "winds",
        DeviceKind::Pressure => "pressures",
    }
}

/// Create the device catalog and all four reading tables if missing.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] on any DDL failure.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query(CREATE_DEVICES).execute(pool).await?;

    for kind in DeviceKind::ALL {
        let ddl = format!(
            r"
            CREATE TABLE IF NOT EXISTS {} (
                id           SERIAL PRIMARY KEY,
                device_id    TEXT NOT NULL,
                sensor_value DOUBLE PRECISION NOT NULL,
                time         TIMESTAMPTZ NOT NULL
            )
            ",
            reading_table(kind)
        );
        sqlx::query(&ddl).execute(pool).await?;
    }

    tracing::debug!("Schema ensured");
    Ok(())
}

/// Drop all four reading tables. The device catalog is left intact.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] on any DDL failure.
pub async fn drop_readings(pool: &PgPool) -> Result<(), DbError> {
    for kind in DeviceKind::ALL {
        let ddl = format!("DROP TABLE IF EXISTS {}", reading_table(kind));
        sqlx::query(&ddl).execute(pool).await?;
    }
    tracing::info!("Reading tables dropped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_has_a_distinct_table() {
        let mut names: Vec<&str> = DeviceKind::ALL.iter().map(|k| reading_table(*k)).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 4);
    }
}
