//! Relay error types.
//!
//! Errors are classified by what they cost the relay loop: a session-fatal
//! error tears the subscription down and triggers the reconnect backoff,
//! everything else is confined to the event or lookup that produced it.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the relay and its adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    /// Opening the dedicated subscription connection failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The channel subscribe command was rejected.
    #[error("subscribe to '{channel}' failed: {reason}")]
    Subscribe { channel: String, reason: String },

    /// The subscription connection dropped while waiting.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The liveness probe on an idle session failed.
    #[error("liveness probe failed: {0}")]
    Probe(String),

    /// A reference-data lookup failed.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// A reference-data lookup did not answer in time.
    #[error("lookup timed out after {0:?}")]
    LookupTimeout(Duration),

    /// An enriched event could not be serialized for the wire.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl RelayError {
    /// Whether this error ends the current subscription session.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            RelayError::Connect(_)
                | RelayError::Subscribe { .. }
                | RelayError::ConnectionLost(_)
                | RelayError::Probe(_)
        )
    }
}

/// A notification body that could not be turned into a change event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// The body is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The body is valid JSON but not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A required field is absent or null.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// A field is present but has an unusable value.
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}
