//! # Strike Relay - Change-Notification Relay
//!
//! Relays newly inserted incidents from the data store to every connected
//! streaming client in near-real-time.
//!
//! ## Pipeline
//!
//! ```text
//! INSERT trigger ──NOTIFY incident_trigger──→ NotificationListener
//!                                                   │ raw payload
//!                                                   ↓
//!                                            ChangeEvent::parse
//!                                                   │
//!                                                   ↓
//!                                  ReferenceEnricher (character at T, system)
//!                                                   │
//!                                                   ↓
//!                                              normalize()
//!                                                   │ EnrichedEvent
//!                                                   ↓
//!                                  BroadcastSink ──→ ConnectionRegistry ──→ clients
//! ```
//!
//! ## Listener State Machine
//!
//! ```text
//! [DISCONNECTED] ──→ [CONNECTING] ──subscribed──→ [LISTENING] ←──probe ok── [PROBING]
//!       ↑                 │                          │    └──wait elapsed──→    │
//!       │                 │ error                    │ error                    │ probe failed
//!       └──── backoff ────┴──────────────────────────┴──────────────────────────┘
//! ```
//!
//! The shutdown flag is observed at every transition and interrupts both the
//! bounded wait and the reconnect backoff.
//!
//! ## Module Structure
//!
//! - `domain/` - events, affiliation rule, normalization, configuration, errors
//! - `ports/` - store lookups, notification source, client handles
//! - `adapters/` - PostgreSQL implementations (feature `postgres`)
//! - `registry`, `enricher`, `pipeline`, `sink`, `listener` - the relay components

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod enricher;
pub mod listener;
pub mod pipeline;
pub mod ports;
pub mod registry;
pub mod sink;
pub mod stats;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use domain::{
    CategoryCode, ChangeEvent, CharacterRecord, ClientId, ConfigError, EnrichedEvent,
    Enrichment, Membership, PayloadError, RelayConfig, RelayError,
};
pub use enricher::ReferenceEnricher;
pub use listener::{ListenerState, NotificationListener};
pub use pipeline::RelayPipeline;
pub use ports::{
    ClientHandle, ClientSendError, NotificationSession, NotificationSource, ReferenceLookup,
    StoreCounts, StoreStats,
};
pub use registry::{BroadcastReport, ConnectionRegistry};
pub use sink::BroadcastSink;
pub use stats::{RelayStats, RelayStatsSnapshot};

/// Channel the incident insert trigger notifies on.
pub const DEFAULT_CHANNEL: &str = "incident_trigger";
