//! Readings, per-tick batches, and aggregate query results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DeviceKind;

/// A single simulated sensor reading.
///
/// Immutable once produced; one reading is persisted per registered
/// device per tick while the scheduler is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// The device that produced the value.
    pub device_id: String,
    /// The simulated sensor value.
    pub value: f64,
    /// When the value was produced.
    pub at: DateTime<Utc>,
}

/// All readings produced in one tick, grouped by device kind.
///
/// Ephemeral: a batch exists only to be handed to the broadcast
/// channel after the tick's persistence completes. Late subscribers
/// never see past batches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickBatch {
    /// The tick number that produced this batch (1-based).
    pub tick: u64,
    /// Timestamp of the tick.
    pub at: DateTime<Utc>,
    /// Readings grouped by device kind.
    pub readings: BTreeMap<DeviceKind, Vec<Reading>>,
}

impl TickBatch {
    /// Create an empty batch for the given tick.
    pub fn new(tick: u64, at: DateTime<Utc>) -> Self {
        Self {
            tick,
            at,
            readings: BTreeMap::new(),
        }
    }

    /// Add a reading under its device kind.
    pub fn push(&mut self, kind: DeviceKind, reading: Reading) {
        self.readings.entry(kind).or_default().push(reading);
    }

    /// Total number of readings across all kinds.
    pub fn len(&self) -> usize {
        self.readings.values().map(Vec::len).sum()
    }

    /// Whether the batch contains no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.values().all(Vec::is_empty)
    }
}

/// Result of an `info` aggregate query over one device and time range.
///
/// All fields are `None` when no readings matched the filter: SQL
/// aggregates over an empty set yield NULL and the service passes that
/// through rather than coercing to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingStats {
    /// Smallest matching value, if any rows matched.
    pub minimum: Option<f64>,
    /// Largest matching value, if any rows matched.
    pub maximum: Option<f64>,
    /// Mean of matching values, if any rows matched.
    pub average: Option<f64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reading(id: &str, value: f64) -> Reading {
        Reading {
            device_id: id.to_owned(),
            value,
            at: Utc::now(),
        }
    }

    #[test]
    fn batch_groups_by_kind() {
        let mut batch = TickBatch::new(1, Utc::now());
        batch.push(DeviceKind::Temperature, reading("t1", 28.0));
        batch.push(DeviceKind::Temperature, reading("t2", 30.0));
        batch.push(DeviceKind::Wind, reading("w1", 5.0));

        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.readings.get(&DeviceKind::Temperature).map(Vec::len),
            Some(2)
        );
        assert!(!batch.is_empty());
    }

    #[test]
    fn empty_batch() {
        let batch = TickBatch::new(7, Utc::now());
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn batch_serializes_kinds_as_keys() {
        let mut batch = TickBatch::new(2, Utc::now());
        batch.push(DeviceKind::Humidity, reading("h1", 55.0));
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["readings"]["Humidity"][0]["device_id"], "h1");
    }

    #[test]
    fn empty_stats_is_all_none() {
        let stats = ReadingStats::default();
        assert!(stats.minimum.is_none());
        assert!(stats.maximum.is_none());
        assert!(stats.average.is_none());
    }
}
