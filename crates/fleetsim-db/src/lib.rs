//! PostgreSQL data layer for Fleetsim.
//!
//! The catalog table `devices` holds one row per registered device;
//! each sensor kind has its own append-only reading table
//! (`temperatures`, `humidities`, `winds`, `pressures`). This crate
//! provides the connection pool, runtime schema management, the device
//! catalog store, and the reading store with its aggregate queries.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool and configuration
//! - [`schema`] -- idempotent DDL (create/drop), applied at runtime
//!   because `/api/dropall` + `/api/start` must be able to destroy and
//!   recreate the reading tables
//! - [`catalog`] -- atomic device registration and fetch-all
//! - [`readings`] -- per-kind reading appends and min/max/avg/info
//!   aggregates
//! - [`error`] -- shared error type

pub mod catalog;
pub mod error;
pub mod postgres;
pub mod readings;
pub mod schema;

pub use catalog::{CatalogStore, DeviceRow};
pub use error::DbError;
pub use postgres::PostgresPool;
pub use readings::ReadingStore;
pub use schema::{drop_readings, ensure_schema};
