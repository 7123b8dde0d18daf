//! # Ingestion Pipeline
//!
//! Bytes in, published events out. Owned by the link task, which makes it the
//! single writer of samples and history.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::broadcast::BroadcastHub;
use crate::config::PipelineConfig;
use crate::frame::{validate_frame, FrameDecoder};
use crate::telemetry::{HistoryBuffer, LatestState};

/// Pipeline counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub bytes_received: u64,
    pub frames_decoded: u64,
    pub samples_published: u64,
    pub fixes_recorded: u64,
    pub frames_rejected: u64,
    pub decode_errors: u64,
}

/// Decoder, validator, history and hub wired together
#[derive(Debug)]
pub struct Pipeline {
    decoder: FrameDecoder,
    history: HistoryBuffer,
    hub: Arc<BroadcastHub>,
    stats: PipelineStats,
    stats_log_interval: u64,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig, hub: Arc<BroadcastHub>) -> Self {
        Self {
            decoder: FrameDecoder::new(config.max_frame_len),
            history: HistoryBuffer::new(config.history_capacity),
            hub,
            stats: PipelineStats::default(),
            stats_log_interval: config.stats_log_interval.max(1),
        }
    }

    /// Feed one chunk read from the link
    ///
    /// Returns the number of events published for it. Malformed frames are
    /// logged and skipped.
    pub fn feed(&mut self, chunk: &[u8]) -> usize {
        self.stats.bytes_received += chunk.len() as u64;
        self.decoder.push(chunk);

        let mut published = 0;
        while let Some(frame) = self.decoder.next_frame() {
            match frame {
                Ok(line) if line.is_empty() => {}
                Ok(line) => {
                    self.stats.frames_decoded += 1;
                    if self.ingest_frame(&line).is_some() {
                        published += 1;
                    }
                }
                Err(e) => {
                    self.stats.decode_errors += 1;
                    warn!("Dropped serial input: {}", e);
                }
            }
        }
        published
    }

    /// Validate one frame and publish it
    ///
    /// A fixed sample appends exactly one history entry before the event is
    /// built, so the published history already contains it.
    pub fn ingest_frame(&mut self, line: &str) -> Option<Arc<LatestState>> {
        let sample = match validate_frame(line) {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.frames_rejected += 1;
                debug!("Data format error in line {:?}: {}", line, e);
                return None;
            }
        };

        if let Some(entry) = sample.history_entry() {
            self.history.append(entry);
            self.stats.fixes_recorded += 1;
        }

        let event = self.hub.publish(sample, self.history.snapshot());
        self.stats.samples_published += 1;

        if self.stats.samples_published % self.stats_log_interval == 0 {
            self.log_stats();
        }

        Some(event)
    }

    /// Discard a partially received frame, e.g. after the link was reopened
    pub fn reset_partial_frame(&mut self) {
        if self.decoder.pending() > 0 {
            debug!("Discarding {} bytes of partial frame", self.decoder.pending());
        }
        self.decoder.reset();
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn log_stats(&self) {
        let s = &self.stats;
        info!(
            "Published {} samples ({} GPS fixes, {} rejected frames, {} decode errors, {} bytes)",
            s.samples_published, s.fixes_recorded, s.frames_rejected, s.decode_errors, s.bytes_received
        );
    }
}
