//! Device kinds, walk parameters, and the device catalog record.
//!
//! [`DeviceKind`] is a closed enum: the simulator supports exactly four
//! sensor families and every kind-dependent constant (step bias, hard
//! bounds, seed range) lives in the single lookup table here rather
//! than being repeated at each call site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Device kinds
// ---------------------------------------------------------------------------

/// The kind of sensor a device simulates.
///
/// Serialized with its variant name (`"Temperature"`, `"Humidity"`,
/// `"Wind"`, `"Pressure"`) both in the REST API and in the device
/// catalog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Ambient temperature in degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// Wind speed in meters per second.
    Wind,
    /// Barometric pressure in hectopascals.
    Pressure,
}

/// Random-walk parameters for one device kind.
///
/// Each tick the simulator draws an integer in `[1, 10]`. A draw
/// strictly above `up_threshold` biases the value up by `up_step`
/// while it is below `up_bound`; a draw within `[down_lo, down_hi]`
/// biases it down by `down_step` while it is above `down_bound`; any
/// other draw leaves the value unchanged. Each step is additionally
/// clamped at its own bound, so readings never escape the hard bounds
/// even when a step would overshoot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkParams {
    /// Draws strictly greater than this bias the value upward.
    pub up_threshold: u8,
    /// Hard upper bound; the up step only fires while the value is below it.
    pub up_bound: f64,
    /// Magnitude of an upward step.
    pub up_step: f64,
    /// Inclusive lower edge of the downward draw range.
    pub down_lo: u8,
    /// Inclusive upper edge of the downward draw range.
    pub down_hi: u8,
    /// Hard lower bound; the down step only fires while the value is above it.
    pub down_bound: f64,
    /// Magnitude of a downward step.
    pub down_step: f64,
}

/// Inclusive integer range a fresh device value is seeded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedRange {
    /// Lowest seed value.
    pub lo: i32,
    /// Highest seed value.
    pub hi: i32,
}

impl DeviceKind {
    /// All device kinds, in catalog order.
    pub const ALL: [Self; 4] = [Self::Temperature, Self::Humidity, Self::Wind, Self::Pressure];

    /// Return the walk parameter row for this kind.
    pub const fn walk_params(self) -> WalkParams {
        match self {
            Self::Temperature => WalkParams {
                up_threshold: 8,
                up_bound: 32.0,
                up_step: 0.1,
                down_lo: 7,
                down_hi: 8,
                down_bound: 26.0,
                down_step: 0.1,
            },
            Self::Humidity => WalkParams {
                up_threshold: 8,
                up_bound: 90.0,
                up_step: 1.0,
                down_lo: 7,
                down_hi: 8,
                down_bound: 20.0,
                down_step: 1.0,
            },
            Self::Wind => WalkParams {
                up_threshold: 8,
                up_bound: 18.0,
                up_step: 1.0,
                down_lo: 7,
                down_hi: 8,
                down_bound: 2.0,
                down_step: 1.0,
            },
            Self::Pressure => WalkParams {
                up_threshold: 7,
                up_bound: 1032.0,
                up_step: 1.0,
                down_lo: 5,
                down_hi: 7,
                down_bound: 997.0,
                down_step: 1.0,
            },
        }
    }

    /// Return the nominal seed range for this kind.
    ///
    /// New devices (and every device on scheduler restart) receive a
    /// uniformly random integer from this range as their starting value.
    pub const fn seed_range(self) -> SeedRange {
        match self {
            Self::Temperature => SeedRange { lo: 26, hi: 32 },
            Self::Humidity => SeedRange { lo: 20, hi: 90 },
            Self::Wind => SeedRange { lo: 0, hi: 18 },
            Self::Pressure => SeedRange { lo: 997, hi: 1032 },
        }
    }

    /// The variant name used on the wire and in the catalog.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Wind => "Wind",
            Self::Pressure => "Pressure",
        }
    }
}

impl core::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known [`DeviceKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKindError(pub String);

impl core::fmt::Display for UnknownKindError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown device kind: {}", self.0)
    }
}

impl std::error::Error for UnknownKindError {}

impl core::str::FromStr for DeviceKind {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Temperature" => Ok(Self::Temperature),
            "Humidity" => Ok(Self::Humidity),
            "Wind" => Ok(Self::Wind),
            "Pressure" => Ok(Self::Pressure),
            other => Err(UnknownKindError(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Device catalog record
// ---------------------------------------------------------------------------

/// A registered device as stored in the catalog.
///
/// Created once at registration and immutable thereafter. The
/// `device_id` is globally unique; duplicate registrations are
/// rejected, not overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Caller-supplied unique identifier.
    pub device_id: String,
    /// Human-readable display name.
    pub name: String,
    /// Sensor kind.
    pub kind: DeviceKind,
    /// When the device was registered.
    pub registered_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in DeviceKind::ALL {
            let parsed: DeviceKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "Rainfall".parse::<DeviceKind>().unwrap_err();
        assert_eq!(err, UnknownKindError(String::from("Rainfall")));
    }

    #[test]
    fn kind_serializes_as_variant_name() {
        let json = serde_json::to_string(&DeviceKind::Pressure).unwrap();
        assert_eq!(json, "\"Pressure\"");
    }

    #[test]
    fn walk_params_bounds_are_ordered() {
        for kind in DeviceKind::ALL {
            let p = kind.walk_params();
            assert!(p.down_bound < p.up_bound, "{kind}: bounds inverted");
            assert!(p.down_lo <= p.down_hi);
        }
    }

    #[test]
    fn seed_range_never_exceeds_upper_bound() {
        for kind in DeviceKind::ALL {
            let p = kind.walk_params();
            let s = kind.seed_range();
            assert!(s.lo <= s.hi);
            assert!(f64::from(s.hi) <= p.up_bound);
        }
    }
}
