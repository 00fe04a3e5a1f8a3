//! Adapters layer for the relay.
//!
//! PostgreSQL implementations of the notification source, the reference
//! lookups and the store counters.

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::{PgEndpoint, PgNotificationSession, PgNotificationSource, PgReferenceStore};
