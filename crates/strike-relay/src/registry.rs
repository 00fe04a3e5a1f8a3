//! Connection registry: the set of streaming clients eligible for broadcast.
//!
//! One mutex covers the whole member set. `broadcast` copies the members out
//! under the lock and releases it before any I/O, so a slow client never
//! blocks `add`/`remove` from the transport side.

use crate::domain::ClientId;
use crate::ports::{ClientHandle, ClientSendError};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members in the snapshot, i.e. send attempts made.
    pub attempted: usize,
    /// Attempts that failed.
    pub failed: usize,
}

impl BroadcastReport {
    pub fn delivered(&self) -> usize {
        self.attempted - self.failed
    }
}

/// Registry of connected streaming clients.
///
/// Handles are owned by the transport; the registry only references them.
/// Failed sends never remove a member, the transport's own close path does.
#[derive(Default)]
pub struct ConnectionRegistry {
    members: Mutex<HashMap<ClientId, Arc<dyn ClientHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. Returns `false` if the id was already present,
    /// in which case the handle is replaced.
    pub fn add(&self, id: ClientId, handle: Arc<dyn ClientHandle>) -> bool {
        let replaced = self.members.lock().insert(id, handle).is_some();
        debug!(client_id = %id, replaced, "Client registered");
        !replaced
    }

    /// Unregister a client. Returns `false` if it was not registered.
    pub fn remove(&self, id: &ClientId) -> bool {
        let removed = self.members.lock().remove(id).is_some();
        if removed {
            debug!(client_id = %id, "Client unregistered");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    fn snapshot(&self) -> Vec<(ClientId, Arc<dyn ClientHandle>)> {
        self.members
            .lock()
            .iter()
            .map(|(id, handle)| (*id, Arc::clone(handle)))
            .collect()
    }

    /// Send one frame to every current member.
    ///
    /// Sends run concurrently; the call returns once every attempt finished,
    /// which keeps per-client order equal to broadcast order.
    pub async fn broadcast(&self, frame: Arc<str>) -> BroadcastReport {
        let members = self.snapshot();
        let attempted = members.len();

        let sends = members.into_iter().map(|(id, handle)| {
            let frame = Arc::clone(&frame);
            async move { (id, handle.send_text(frame).await) }
        });

        let failed = join_all(sends)
            .await
            .into_iter()
            .filter_map(|(id, result)| result.err().map(|e| (id, e)))
            .inspect(|(id, e)| log_send_failure(id, e))
            .count();

        BroadcastReport { attempted, failed }
    }
}

fn log_send_failure(id: &ClientId, error: &ClientSendError) {
    warn!(client_id = %id, error = %error, "Failed to deliver event to client");
}
