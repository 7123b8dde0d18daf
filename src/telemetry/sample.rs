//! # Telemetry Sample Types
//!
//! Value types produced by the frame validator and published to subscribers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Valid latitude range in degrees
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// Name under which transports emit published events
pub const TELEMETRY_EVENT_NAME: &str = "telemetry_update";

/// One parsed sensor reading
///
/// A sample with `gps_fix == true` always carries in-range coordinates.
/// Out-of-range coordinates are replaced by `0.0` and clear the fix flag
/// before a `Sample` is ever constructed by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Ultrasonic distance reading
    pub distance: f64,

    /// Temperature in °C
    pub temperature: f64,

    /// Relative humidity in %
    pub humidity: f64,

    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,

    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,

    /// GPS altitude in meters
    pub altitude: f64,

    /// Whether the GPS reported a usable fix
    pub gps_fix: bool,

    /// Device heartbeat flag
    pub heartbeat: bool,

    /// Capture time, assigned when the frame was parsed
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// All-zero sample served before the first frame arrives
    pub fn zeroed(timestamp: DateTime<Utc>) -> Self {
        Self {
            distance: 0.0,
            temperature: 0.0,
            humidity: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            gps_fix: false,
            heartbeat: false,
            timestamp,
        }
    }

    /// Whether both coordinates are within their valid ranges
    ///
    /// NaN coordinates are never in range.
    pub fn has_valid_coordinates(&self) -> bool {
        LATITUDE_RANGE.contains(&self.latitude) && LONGITUDE_RANGE.contains(&self.longitude)
    }

    /// Project this sample onto a history entry
    ///
    /// Returns `None` unless the sample carries a GPS fix.
    pub fn history_entry(&self) -> Option<HistoryEntry> {
        self.gps_fix.then(|| HistoryEntry {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            time: self.timestamp,
        })
    }
}

/// One geolocation fix kept in the rolling history
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(rename = "lat")]
    pub latitude: f64,

    #[serde(rename = "lng")]
    pub longitude: f64,

    #[serde(rename = "alt")]
    pub altitude: f64,

    pub time: DateTime<Utc>,
}

/// Most recent sample together with the history at the time it was published
///
/// This is both the shape of every published event and the answer to a
/// snapshot query. Instances are shared behind `Arc` and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestState {
    pub current: Sample,
    pub history: Arc<[HistoryEntry]>,
}

impl LatestState {
    /// State served before anything has been published
    pub fn initial(timestamp: DateTime<Utc>) -> Self {
        Self {
            current: Sample::zeroed(timestamp),
            history: Arc::from(Vec::new()),
        }
    }

    /// Serialize as the `{"current": ..., "history": [...]}` JSON document
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn sample(latitude: f64, longitude: f64, gps_fix: bool) -> Sample {
        Sample {
            distance: 12.5,
            temperature: 22.0,
            humidity: 55.0,
            latitude,
            longitude,
            altitude: 10.0,
            gps_fix,
            heartbeat: true,
            timestamp: fixed_time(),
        }
    }

    #[test]
    fn test_zeroed_sample() {
        let s = Sample::zeroed(fixed_time());
        assert_eq!(s.distance, 0.0);
        assert_eq!(s.latitude, 0.0);
        assert!(!s.gps_fix);
        assert!(!s.heartbeat);
        assert_eq!(s.timestamp, fixed_time());
    }

    #[test]
    fn test_coordinate_range_edges() {
        assert!(sample(90.0, 180.0, true).has_valid_coordinates());
        assert!(sample(-90.0, -180.0, true).has_valid_coordinates());
        assert!(!sample(90.0001, 0.0, true).has_valid_coordinates());
        assert!(!sample(0.0, -180.5, true).has_valid_coordinates());
        assert!(!sample(f64::NAN, 0.0, true).has_valid_coordinates());
    }

    #[test]
    fn test_history_entry_requires_fix() {
        assert!(sample(37.77, -122.41, false).history_entry().is_none());

        let entry = sample(37.77, -122.41, true).history_entry().unwrap();
        assert_eq!(entry.latitude, 37.77);
        assert_eq!(entry.longitude, -122.41);
        assert_eq!(entry.altitude, 10.0);
        assert_eq!(entry.time, fixed_time());
    }

    #[test]
    fn test_latest_state_json_shape() {
        let s = sample(37.77, -122.41, true);
        let state = LatestState {
            current: s,
            history: Arc::from(vec![s.history_entry().unwrap()]),
        };

        let json: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
        assert_eq!(json["current"]["distance"], 12.5);
        assert_eq!(json["current"]["gps_fix"], true);
        assert_eq!(json["current"]["timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(json["history"][0]["lat"], 37.77);
        assert_eq!(json["history"][0]["lng"], -122.41);
        assert_eq!(json["history"][0]["alt"], 10.0);
    }

    #[test]
    fn test_initial_state_is_empty() {
        let state = LatestState::initial(fixed_time());
        assert_eq!(state.current, Sample::zeroed(fixed_time()));
        assert!(state.history.is_empty());
    }
}
