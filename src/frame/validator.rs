//! # Frame Validator
//!
//! Parses one candidate frame into a [`Sample`].

use chrono::{DateTime, Utc};

use super::protocol::*;
use crate::error::ValidationError;
use crate::telemetry::Sample;

/// Parse a frame, stamping the sample with the current time
///
/// # Arguments
///
/// * `frame` - One trimmed line from the [`FrameDecoder`](super::decoder::FrameDecoder)
///
/// # Returns
///
/// * `Result<Sample, ValidationError>` - Parsed sample, or why the frame was rejected
///
/// # Examples
///
/// ```
/// use telemetry_bridge::frame::validator::validate_frame;
///
/// let sample = validate_frame("12.5,22.0,55.0,37.77,-122.41,10.0,1,1").unwrap();
/// assert!(sample.gps_fix);
///
/// let fallback = validate_frame("1,2,3,95.0,200.0,4,1,0").unwrap();
/// assert!(!fallback.gps_fix);
/// assert_eq!(fallback.latitude, 0.0);
/// ```
pub fn validate_frame(frame: &str) -> Result<Sample, ValidationError> {
    validate_frame_at(frame, Utc::now())
}

/// Parse a frame with an explicit capture time
///
/// Out-of-range (or NaN) coordinates do not reject the frame: latitude and
/// longitude are zeroed and the fix flag cleared, all other fields are kept.
pub fn validate_frame_at(frame: &str, timestamp: DateTime<Utc>) -> Result<Sample, ValidationError> {
    let first = frame.chars().next().ok_or(ValidationError::Empty)?;
    if !is_frame_start(first) {
        return Err(ValidationError::UnexpectedLeadingChar(first));
    }

    let fields: Vec<&str> = frame.split(FIELD_SEPARATOR).map(str::trim).collect();
    if fields.len() != FRAME_FIELD_COUNT {
        return Err(ValidationError::FieldCount {
            expected: FRAME_FIELD_COUNT,
            found: fields.len(),
        });
    }

    let number = |index: usize| parse_number(fields[index], FIELD_NAMES[index]);
    let flag = |index: usize| parse_flag(fields[index], FIELD_NAMES[index]);

    let mut sample = Sample {
        distance: number(FIELD_DISTANCE)?,
        temperature: number(FIELD_TEMPERATURE)?,
        humidity: number(FIELD_HUMIDITY)?,
        latitude: number(FIELD_LATITUDE)?,
        longitude: number(FIELD_LONGITUDE)?,
        altitude: number(FIELD_ALTITUDE)?,
        gps_fix: flag(FIELD_GPS_FIX)?,
        heartbeat: flag(FIELD_HEARTBEAT)?,
        timestamp,
    };

    if !sample.has_valid_coordinates() {
        sample.latitude = 0.0;
        sample.longitude = 0.0;
        sample.gps_fix = false;
    }

    Ok(sample)
}

fn parse_number(value: &str, field: &'static str) -> Result<f64, ValidationError> {
    value.parse::<f64>().map_err(|_| ValidationError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Flags are decimal numbers truncated toward zero; any non-zero integer part
/// is true, including negative values. `0.9` is false.
fn parse_flag(value: &str, field: &'static str) -> Result<bool, ValidationError> {
    let number = parse_number(value, field)?;
    if !number.is_finite() {
        return Err(ValidationError::InvalidNumber {
            field,
            value: value.to_string(),
        });
    }
    Ok(number.trunc() != 0.0)
}
