//! Shared type definitions for the Fleetsim sensor simulator.
//!
//! This crate holds the types that cross crate boundaries: the closed
//! [`DeviceKind`] enum with its per-kind random-walk parameter table,
//! the [`Device`] catalog record, and the [`Reading`] / [`TickBatch`]
//! data produced by the tick scheduler and consumed by the persistence
//! and broadcast layers.

pub mod device;
pub mod reading;

pub use device::{Device, DeviceKind, SeedRange, UnknownKindError, WalkParams};
pub use reading::{Reading, ReadingStats, TickBatch};
