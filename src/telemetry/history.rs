//! # GPS History Buffer
//!
//! Fixed-capacity FIFO of geolocation fixes.

use std::collections::VecDeque;
use std::sync::Arc;

use super::sample::HistoryEntry;

/// Default number of fixes kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Rolling history of GPS fixes, oldest first
///
/// Appending beyond capacity evicts the oldest entry. Snapshots are frozen
/// copies: later appends never change a snapshot already handed out.
#[derive(Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    /// Cached snapshot, invalidated on append
    snapshot: Option<Arc<[HistoryEntry]>>,
}

impl HistoryBuffer {
    /// Create an empty buffer holding at most `capacity` entries
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            snapshot: None,
        }
    }

    /// Append a fix, evicting the oldest one if the buffer is full
    pub fn append(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.snapshot = None;
    }

    /// Immutable copy of the current contents, oldest first
    pub fn snapshot(&mut self) -> Arc<[HistoryEntry]> {
        if let Some(snapshot) = &self.snapshot {
            return Arc::clone(snapshot);
        }

        let snapshot: Arc<[HistoryEntry]> = self.entries.iter().copied().collect();
        self.snapshot = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
