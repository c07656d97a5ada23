use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time counters for an announcer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnouncerStats {
    /// Distinct triples held in the registry
    pub triples_registered: u64,
    /// Publishes the bus accepted
    pub publishes_sent: u64,
    /// Publishes the bus rejected
    pub publishes_failed: u64,
    /// Full replays triggered by router startups
    pub resyncs: u64,
    /// Lifecycle messages from other services, or unreadable ones
    pub lifecycle_ignored: u64,
    pub last_resync_at: Option<DateTime<Utc>>,
}

/// Outcome of one full replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
    pub published: usize,
    pub failed: usize,
}

impl ResyncReport {
    pub fn total(&self) -> usize {
        self.published + self.failed
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    triples: AtomicU64,
    sent: AtomicU64,
    failed: AtomicU64,
    resyncs: AtomicU64,
    ignored: AtomicU64,
    // millis since epoch, 0 = never
    last_resync_ms: AtomicI64,
}

impl Counters {
    pub(crate) fn record_triple(&self) {
        self.triples.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_publish(&self, ok: bool) {
        if ok {
            self.sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_resync(&self, at: DateTime<Utc>) {
        self.resyncs.fetch_add(1, Ordering::Relaxed);
        self.last_resync_ms.store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub(crate) fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> AnnouncerStats {
        let last_ms = self.last_resync_ms.load(Ordering::Relaxed);
        AnnouncerStats {
            triples_registered: self.triples.load(Ordering::Relaxed),
            publishes_sent: self.sent.load(Ordering::Relaxed),
            publishes_failed: self.failed.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            lifecycle_ignored: self.ignored.load(Ordering::Relaxed),
            last_resync_at: (last_ms != 0)
                .then(|| DateTime::from_timestamp_millis(last_ms))
                .flatten(),
        }
    }
}
