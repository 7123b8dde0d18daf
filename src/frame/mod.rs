//! # Frame Module
//!
//! Text frame handling for the sensor's serial output.
//!
//! This module handles:
//! - Reassembling newline-delimited frames from chunked reads
//! - Dropping non-text noise and runaway lines
//! - Parsing the 8 comma-separated fields into a `Sample`
//! - The coordinate sanity check and fallback

pub mod decoder;
pub mod protocol;
pub mod validator;

pub use decoder::FrameDecoder;
pub use validator::{validate_frame, validate_frame_at};
