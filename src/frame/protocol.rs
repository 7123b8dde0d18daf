//! # Frame Wire Format
//!
//! The sensor sketch prints one ASCII line per reading:
//!
//! ```text
//! distance,temperature,humidity,latitude,longitude,altitude,gps_fix,heartbeat\n
//! ```
//!
//! All fields are decimal numbers. The two flags are `0` or non-zero.

/// Frame delimiter
pub const FRAME_DELIMITER: u8 = b'\n';

/// Field separator within a frame
pub const FIELD_SEPARATOR: char = ',';

/// Number of fields in every frame
pub const FRAME_FIELD_COUNT: usize = 8;

/// Field names in wire order
pub const FIELD_NAMES: [&str; FRAME_FIELD_COUNT] = [
    "distance",
    "temperature",
    "humidity",
    "latitude",
    "longitude",
    "altitude",
    "gps_fix",
    "heartbeat",
];

/// Positions of each field within a frame
pub const FIELD_DISTANCE: usize = 0;
pub const FIELD_TEMPERATURE: usize = 1;
pub const FIELD_HUMIDITY: usize = 2;
pub const FIELD_LATITUDE: usize = 3;
pub const FIELD_LONGITUDE: usize = 4;
pub const FIELD_ALTITUDE: usize = 5;
pub const FIELD_GPS_FIX: usize = 6;
pub const FIELD_HEARTBEAT: usize = 7;

/// Default upper bound on buffered bytes without a delimiter
///
/// A full frame is well under 100 bytes; anything this long is noise.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;

/// Whether `c` may start a numeric frame
///
/// Cheap filter for boot banners and debug prints from the sketch.
pub fn is_frame_start(c: char) -> bool {
    c.is_ascii_digit() || c == '-' || c == '.'
}
