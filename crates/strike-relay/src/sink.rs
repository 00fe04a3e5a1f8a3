//! Broadcast sink: serialize once, fan out through the registry.

use crate::domain::{EnrichedEvent, RelayError};
use crate::registry::{BroadcastReport, ConnectionRegistry};
use crate::stats::RelayStats;
use std::sync::Arc;
use tracing::debug;

/// Publishes enriched events to every registered client.
pub struct BroadcastSink {
    registry: Arc<ConnectionRegistry>,
    stats: Arc<RelayStats>,
}

impl BroadcastSink {
    pub fn new(registry: Arc<ConnectionRegistry>, stats: Arc<RelayStats>) -> Self {
        Self { registry, stats }
    }

    /// Serialize `event` and send the same bytes to every registry member.
    ///
    /// A serialization failure drops this event only. Per-client failures
    /// are reported, never returned as errors.
    pub async fn publish(&self, event: &EnrichedEvent) -> Result<BroadcastReport, RelayError> {
        let frame: Arc<str> = serde_json::to_string(event)
            .map_err(|e| RelayError::Serialization(e.to_string()))?
            .into();

        let report = self.registry.broadcast(frame).await;
        self.stats
            .record_published(report.delivered(), report.failed);

        debug!(
            event_id = event.id,
            attempted = report.attempted,
            failed = report.failed,
            "Event broadcast"
        );
        Ok(report)
    }
}
