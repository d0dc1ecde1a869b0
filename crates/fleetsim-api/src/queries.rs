//! Request bodies and parsing for the query endpoints.

use chrono::{DateTime, NaiveDateTime, Utc};
use fleetsim_types::DeviceKind;

use crate::error::ApiError;

/// Body of `POST /api/register`.
#[derive(Debug, serde::Deserialize)]
pub struct RegisterRequest {
    /// Caller-assigned device identifier, unique across the fleet.
    pub device_id: String,
    /// Human-readable device name.
    pub name: String,
    /// Sensor type.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Filter body shared by the aggregate endpoints
/// (`/api/average`, `/api/max`, `/api/min`, `/api/info`).
#[derive(Debug, serde::Deserialize)]
pub struct AggregateRequest {
    /// Device to aggregate over.
    #[serde(rename = "deviceID")]
    pub device_id: String,
    /// Inclusive window start.
    #[serde(rename = "startTime")]
    pub start_time: String,
    /// Inclusive window end.
    #[serde(rename = "endTime")]
    pub end_time: String,
    /// Sensor type, selects the reading table.
    #[serde(rename = "type")]
    pub kind: String,
}

impl AggregateRequest {
    /// Parse the kind and both timestamps, surfacing client errors.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidType`] or [`ApiError::InvalidTimestamp`].
    pub fn parse(&self) -> Result<(DeviceKind, DateTime<Utc>, DateTime<Utc>), ApiError> {
        let kind = parse_kind(&self.kind)?;
        let start = parse_timestamp(&self.start_time)?;
        let end = parse_timestamp(&self.end_time)?;
        Ok((kind, start, end))
    }
}

/// Parse a sensor kind from request text.
///
/// # Errors
///
/// Returns [`ApiError::InvalidType`] for anything outside the closed set.
pub fn parse_kind(raw: &str) -> Result<DeviceKind, ApiError> {
    raw.parse::<DeviceKind>()
        .map_err(|e| ApiError::InvalidType(e.to_string()))
}

/// Parse a timestamp in RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC) form.
///
/// # Errors
///
/// Returns [`ApiError::InvalidTimestamp`] when neither format matches.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| ApiError::InvalidTimestamp(raw.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_timestamp_accepts_rfc3339() {
        let dt = parse_timestamp("2026-08-29T12:00:00Z").unwrap();
        assert_eq!(dt.timestamp(), 1_788_004_800);
    }

    #[test]
    fn parse_timestamp_accepts_space_separated_utc() {
        let a = parse_timestamp("2026-08-29 12:00:00").unwrap();
        let b = parse_timestamp("2026-08-29T12:00:00Z").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn parse_kind_rejects_unknown() {
        assert!(parse_kind("Radiation").is_err());
        assert_eq!(parse_kind("Wind").unwrap(), DeviceKind::Wind);
    }

    #[test]
    fn aggregate_request_uses_wire_field_names() {
        let req: AggregateRequest = serde_json::from_value(serde_json::json!({
            "deviceID": "t1",
            "startTime": "2026-08-29 00:00:00",
            "endTime": "2026-08-29 23:59:59",
            "type": "Temperature",
        }))
        .unwrap();
        let (kind, start, end) = req.parse().unwrap();
        assert_eq!(kind, DeviceKind::Temperature);
        assert!(start < end);
    }
}
