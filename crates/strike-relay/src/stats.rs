//! Relay counters.
//!
//! Shared by the listener, pipeline and sink; read by the health endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Relay loop counters
#[derive(Debug, Default)]
pub struct RelayStats {
    // Session counters
    pub sessions_opened: AtomicU64,
    pub reconnects: AtomicU64,
    pub probe_failures: AtomicU64,

    // Event counters
    pub notifications_received: AtomicU64,
    pub malformed_dropped: AtomicU64,
    pub events_published: AtomicU64,

    // Delivery counters
    pub deliveries: AtomicU64,
    pub delivery_failures: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription session reaching the listening state
    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reconnect cycle starting
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe_failure(&self) {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one broadcast and its per-client outcome
    pub fn record_published(&self, delivered: usize, failed: usize) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            probe_failures: self.probe_failures.load(Ordering::Relaxed),
            notifications_received: self.notifications_received.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RelayStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayStatsSnapshot {
    pub sessions_opened: u64,
    pub reconnects: u64,
    pub probe_failures: u64,
    pub notifications_received: u64,
    pub malformed_dropped: u64,
    pub events_published: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
}
