//! Registry-facing handle for one WebSocket connection.

use async_trait::async_trait;
use axum::extract::ws::Message;
use std::sync::Arc;
use strike_relay::{ClientHandle, ClientSendError};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Enqueues frames on the connection's bounded outbound queue.
///
/// Never waits: a client that is not draining its queue gets
/// [`ClientSendError::Backpressure`] instead of stalling the broadcast.
pub struct WsClient {
    outbound: mpsc::Sender<Message>,
}

impl WsClient {
    pub fn new(outbound: mpsc::Sender<Message>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl ClientHandle for WsClient {
    async fn send_text(&self, frame: Arc<str>) -> Result<(), ClientSendError> {
        self.outbound
            .try_send(Message::Text(frame.to_string()))
            .map_err(|e| match e {
                TrySendError::Full(_) => ClientSendError::Backpressure,
                TrySendError::Closed(_) => ClientSendError::Closed,
            })
    }
}
