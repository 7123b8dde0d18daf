//! # Telemetry Module
//!
//! Sample data model and the rolling GPS history.
//!
//! This module handles:
//! - The `Sample` value produced for every valid frame
//! - Projecting fixed samples onto `HistoryEntry` records
//! - Keeping the last N fixes in insertion order
//! - The `LatestState` snapshot shared with subscribers

pub mod history;
pub mod sample;

pub use history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
pub use sample::{HistoryEntry, LatestState, Sample, TELEMETRY_EVENT_NAME};
