//! Per-notification processing: parse, enrich, normalize, publish.

use crate::domain::{normalize, ChangeEvent};
use crate::enricher::ReferenceEnricher;
use crate::registry::BroadcastReport;
use crate::sink::BroadcastSink;
use crate::stats::RelayStats;
use std::sync::Arc;
use tracing::{debug, warn};

/// What happened to one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Broadcast to the registry.
    Published(BroadcastReport),
    /// Body could not be parsed; nothing was sent.
    Malformed,
    /// Serialization failed; nothing was sent.
    Dropped,
}

/// The stages a notification goes through between the listener and clients.
///
/// None of the outcomes are fatal to the listening session.
pub struct RelayPipeline {
    enricher: ReferenceEnricher,
    sink: BroadcastSink,
    stats: Arc<RelayStats>,
}

impl RelayPipeline {
    pub fn new(enricher: ReferenceEnricher, sink: BroadcastSink, stats: Arc<RelayStats>) -> Self {
        Self {
            enricher,
            sink,
            stats,
        }
    }

    /// Process one raw notification body to completion.
    pub async fn process(&self, payload: &str) -> Dispatch {
        self.stats.record_notification();

        let event = match ChangeEvent::parse(payload) {
            Ok(event) => event,
            Err(e) => {
                self.stats.record_malformed();
                warn!(error = %e, payload_len = payload.len(), "Dropping malformed notification");
                return Dispatch::Malformed;
            }
        };

        let enrichment = self
            .enricher
            .resolve(
                event.victim_id,
                event.killer_id,
                event.solar_system_id,
                event.time_stamp,
            )
            .await;
        let enriched = normalize(&event, enrichment);

        match self.sink.publish(&enriched).await {
            Ok(report) => {
                debug!(event_id = event.id, delivered = report.delivered(), "Notification relayed");
                Dispatch::Published(report)
            }
            Err(e) => {
                warn!(event_id = event.id, error = %e, "Dropping event");
                Dispatch::Dropped
            }
        }
    }
}
