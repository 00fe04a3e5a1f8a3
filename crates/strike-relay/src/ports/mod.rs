//! Ports for the relay.
//!
//! The relay depends on three external collaborators: the reference data
//! store, the notification channel and the streaming transport's clients.

pub mod outbound;

pub use outbound::{
    ClientHandle, ClientSendError, NotificationSession, NotificationSource, ReferenceLookup,
    StoreCounts, StoreStats,
};
