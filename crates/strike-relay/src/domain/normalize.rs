//! Payload normalization: display rules applied before an event goes out.

use super::enriched::{CharacterRecord, EnrichedEvent, Enrichment};
use super::event::{CategoryCode, ChangeEvent};

/// Label shown for loss category `0`.
pub const STRUCTURE_LOSS_LABEL: &str = "ship/structure";

/// Label shown for a resolved character that held no tribe at event time.
///
/// A character that could not be resolved at all keeps an empty tribe name.
pub const NO_AFFILIATION_LABEL: &str = "Unaffiliated";

/// Shape a change event and its enrichment into the wire schema.
pub fn normalize(event: &ChangeEvent, enrichment: Enrichment) -> EnrichedEvent {
    let (victim_name, victim_address, victim_tribe_name) = character_fields(enrichment.victim);
    let (killer_name, killer_address, killer_tribe_name) = character_fields(enrichment.killer);

    EnrichedEvent {
        id: event.id,
        victim_address,
        victim_name,
        victim_tribe_name,
        loss_type: category_label(&event.category),
        killer_address,
        killer_name,
        killer_tribe_name,
        time_stamp: event.time_stamp,
        solar_system_id: event.solar_system_id,
        solar_system_name: enrichment.system_name.unwrap_or_default(),
    }
}

/// Display label for a loss category.
pub fn category_label(category: &CategoryCode) -> String {
    if category.is_structure_loss() {
        STRUCTURE_LOSS_LABEL.to_string()
    } else {
        category.to_string()
    }
}

fn character_fields(record: Option<CharacterRecord>) -> (String, String, String) {
    match record {
        Some(record) => {
            let tribe = record
                .affiliation
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| NO_AFFILIATION_LABEL.to_string());
            (record.name, record.address, tribe)
        }
        None => (String::new(), String::new(), String::new()),
    }
}
