//! Hub counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters updated by the hub loop and the broadcast intake
#[derive(Debug, Default)]
pub(crate) struct HubStats {
    registered: AtomicU64,
    unregistered: AtomicU64,
    evicted: AtomicU64,
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
    dropped_at_intake: AtomicU64,
}

impl HubStats {
    pub(crate) fn record_registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unregistered(&self) {
        self.unregistered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, count: usize) {
        self.evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self, deliveries: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(deliveries as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped_at_intake.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, live: usize) -> HubStatsSnapshot {
        HubStatsSnapshot {
            live,
            registered: self.registered.load(Ordering::Relaxed),
            unregistered: self.unregistered.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            dropped_at_intake: self.dropped_at_intake.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the hub, served by the stats endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubStatsSnapshot {
    /// Connections currently live
    pub live: usize,
    /// Successful registrations
    pub registered: u64,
    /// Connections removed by an unregister request
    pub unregistered: u64,
    /// Connections removed during a broadcast (full or closed mailbox)
    pub evicted: u64,
    /// Broadcasts fanned out by the loop
    pub broadcasts: u64,
    /// Total mailbox enqueues across all broadcasts
    pub deliveries: u64,
    /// Broadcasts refused because the intake was full
    pub dropped_at_intake: u64,
}
