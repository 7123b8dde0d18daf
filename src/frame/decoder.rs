//! # Frame Decoder
//!
//! Reassembles newline-delimited text frames from arbitrarily chunked serial
//! reads.
//!
//! The accumulation buffer is capped at `max_frame_len` bytes. When a line
//! grows past that without a delimiter the pending bytes are dropped, an
//! [`DecodeError::Overflow`] is reported once, and everything up to the next
//! delimiter is skipped so framing resumes on a clean line.

use bytes::BytesMut;

use super::protocol::{DEFAULT_MAX_FRAME_LEN, FRAME_DELIMITER};
use crate::error::DecodeError;

/// Streaming line decoder
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    max_frame_len: usize,
    /// Set after an overflow until the next delimiter is seen
    discarding: bool,
}

impl FrameDecoder {
    /// Create a decoder that buffers at most `max_frame_len` bytes per frame
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_frame_len.min(4096)),
            max_frame_len,
            discarding: false,
        }
    }

    /// Append raw bytes read from the link
    ///
    /// Zero-length chunks are accepted and change nothing.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Extract the next complete frame, if any
    ///
    /// Returns `None` once no further delimiter is buffered. The returned
    /// frame is trimmed of surrounding whitespace and may be empty.
    pub fn next_frame(&mut self) -> Option<Result<String, DecodeError>> {
        loop {
            let Some(pos) = self.buffer.iter().position(|&b| b == FRAME_DELIMITER) else {
                return self.check_overflow();
            };

            let line = self.buffer.split_to(pos + 1);
            if self.discarding {
                // Tail of an oversized line
                self.discarding = false;
                continue;
            }

            let body = &line[..pos];
            if body.len() > self.max_frame_len {
                return Some(Err(DecodeError::Overflow {
                    len: body.len(),
                    limit: self.max_frame_len,
                }));
            }

            return Some(decode_text(body));
        }
    }

    /// Iterate over all complete frames currently buffered
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { decoder: self }
    }

    /// Number of buffered bytes not yet part of a complete frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial frame, e.g. after the link was reopened
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    fn check_overflow(&mut self) -> Option<Result<String, DecodeError>> {
        if self.buffer.len() <= self.max_frame_len {
            return None;
        }

        let len = self.buffer.len();
        self.buffer.clear();

        if self.discarding {
            // Already reported for this line
            return None;
        }
        self.discarding = true;

        Some(Err(DecodeError::Overflow {
            len,
            limit: self.max_frame_len,
        }))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

/// Lazy iterator over buffered frames, see [`FrameDecoder::frames`]
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = Result<String, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_frame()
    }
}

fn decode_text(body: &[u8]) -> Result<String, DecodeError> {
    if !body.is_ascii() {
        return Err(DecodeError::NotText { len: body.len() });
    }

    std::str::from_utf8(body)
        .map(|text| text.trim().to_string())
        .map_err(|_| DecodeError::NotText { len: body.len() })
}
