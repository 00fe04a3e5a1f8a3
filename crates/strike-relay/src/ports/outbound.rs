//! Outbound (driven) ports for the relay.

use crate::domain::{CharacterRecord, RelayError};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Point lookups against the reference data.
///
/// Both lookups key by exact foreign key and may legitimately find nothing.
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    /// Resolve a character together with the tribe it held at `at`.
    async fn character_at(
        &self,
        character_id: i64,
        at: i64,
    ) -> Result<Option<CharacterRecord>, RelayError>;

    /// Resolve a solar system's display name.
    async fn system_name(&self, system_id: i64) -> Result<Option<String>, RelayError>;
}

/// Row counts reported by the health endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub characters: i64,
    pub incidents: i64,
}

/// Aggregate counters over the store.
#[async_trait]
pub trait StoreStats: Send + Sync {
    async fn counts(&self) -> Result<StoreCounts, RelayError>;
}

/// Opens subscription sessions on the notification channel.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    type Session: NotificationSession;

    /// Open a fresh, dedicated connection.
    async fn connect(&self) -> Result<Self::Session, RelayError>;
}

/// One live subscription connection, owned by the relay loop.
#[async_trait]
pub trait NotificationSession: Send {
    /// Issue the subscribe command for `channel`.
    async fn subscribe(&mut self, channel: &str) -> Result<(), RelayError>;

    /// Wait at most `wait` for the next notification payload.
    ///
    /// `Ok(None)` means the wait elapsed with nothing delivered; errors mean
    /// the connection is no longer usable.
    async fn next_notification(&mut self, wait: Duration) -> Result<Option<String>, RelayError>;

    /// Run a trivial query to check the connection is still alive.
    async fn probe(&mut self) -> Result<(), RelayError>;
}

/// Per-client send failures. Never fatal to the relay.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientSendError {
    /// The client's connection has already gone away.
    #[error("client connection closed")]
    Closed,
    /// The client is not draining its outbound queue.
    #[error("client outbound queue full")]
    Backpressure,
    /// The transport reported an error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A connected streaming client, owned by the transport layer.
#[async_trait]
pub trait ClientHandle: Send + Sync {
    /// Deliver one serialized document.
    async fn send_text(&self, frame: Arc<str>) -> Result<(), ClientSendError>;
}
