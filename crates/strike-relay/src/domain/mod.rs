//! Domain layer: pure types and rules, no I/O.

pub mod affiliation;
pub mod client;
pub mod config;
pub mod enriched;
pub mod errors;
pub mod event;
pub mod normalize;

pub use affiliation::{affiliation_at, Membership};
pub use client::ClientId;
pub use config::{ConfigError, RelayConfig};
pub use enriched::{CharacterRecord, EnrichedEvent, Enrichment};
pub use errors::{PayloadError, RelayError};
pub use event::{CategoryCode, ChangeEvent};
pub use normalize::{normalize, NO_AFFILIATION_LABEL, STRUCTURE_LOSS_LABEL};
