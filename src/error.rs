//! # Error Types
//!
//! Custom error types for Telemetry Bridge using `thiserror`.
//!
//! Link and configuration failures use [`BridgeError`]. Frame-level failures
//! are split into [`DecodeError`] (bytes that never became a text frame) and
//! [`ValidationError`] (text frames that did not parse into a sample). Both of
//! the latter are local to one unit of data and never stop the pipeline.

use thiserror::Error;

/// Main error type for Telemetry Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No serial device matched the configured identification patterns
    #[error("No serial device matching [{0}] found")]
    DeviceNotFound(String),

    /// A device was found but could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Reconnection policy ran out of attempts
    #[error("Gave up reconnecting after {0} attempts")]
    ReconnectExhausted(u32),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A chunk of link bytes that could not be turned into a candidate frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Frame bytes are not ASCII text
    #[error("Discarded {len}-byte frame that is not ASCII text")]
    NotText { len: usize },

    /// No delimiter arrived before the accumulation limit was reached
    #[error("Discarded {len} bytes without a frame delimiter (limit {limit})")]
    Overflow { len: usize, limit: usize },
}

/// A candidate frame that does not describe a valid sample
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Blank line
    #[error("Empty frame")]
    Empty,

    /// Frame starts with something other than a number (log noise, partial frame)
    #[error("Frame starts with unexpected character {0:?}")]
    UnexpectedLeadingChar(char),

    /// Wrong number of comma-separated fields
    #[error("Expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A field did not parse as a number
    #[error("Invalid {field} value {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Result type alias for Telemetry Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
