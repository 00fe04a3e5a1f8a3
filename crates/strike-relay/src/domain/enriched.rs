//! Enrichment results and the consumer-visible event.

use serde::{Deserialize, Serialize};

/// A character resolved at the time of an incident.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterRecord {
    /// Display name.
    pub name: String,
    /// Display address (hex, no prefix).
    pub address: String,
    /// Tribe held at the incident time; `None` when unaffiliated.
    pub affiliation: Option<String>,
}

/// Everything the enricher could resolve for one change event.
///
/// `None` marks a lookup that failed, timed out, was skipped because the
/// foreign key was unusable, or found nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub victim: Option<CharacterRecord>,
    pub killer: Option<CharacterRecord>,
    pub system_name: Option<String>,
}

/// The event as streamed to clients.
///
/// Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    pub id: i64,
    pub victim_address: String,
    pub victim_name: String,
    pub victim_tribe_name: String,
    pub loss_type: String,
    pub killer_address: String,
    pub killer_name: String,
    pub killer_tribe_name: String,
    pub time_stamp: i64,
    pub solar_system_id: Option<i64>,
    pub solar_system_name: String,
}
