//! Counters for the snapshot pipeline.
//!
//! Cheap to clone; all clones share the same counters, so a test or a status
//! line can read them while the publisher task writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// State messages handed to the decoder.
    decoded: Arc<AtomicU64>,
    /// State messages skipped as exact repeats.
    duplicates: Arc<AtomicU64>,
    /// Messages dropped because they failed to decode (any topic).
    malformed: Arc<AtomicU64>,
    /// Queue listings applied.
    queue_updates: Arc<AtomicU64>,
}

/// Point-in-time copy of `SyncStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsReport {
    pub decoded: u64,
    pub duplicates: u64,
    pub malformed: u64,
    pub queue_updates: u64,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decode(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_update(&self) {
        self.queue_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decoded(&self) -> u64 {
        self.decoded.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> StatsReport {
        StatsReport {
            decoded: self.decoded.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            queue_updates: self.queue_updates.load(Ordering::Relaxed),
        }
    }
}
