//! WebSocket connection handler for the `/mails` stream.
//!
//! Each connection is split in two:
//! - a writer task draining a bounded outbound queue into the socket, so
//!   broadcasts from the relay only ever enqueue;
//! - the read loop below, which answers client text with the static
//!   acknowledgment and owns the registry membership.
//!
//! Registry removal happens only here, when the read loop ends.

use crate::domain::messages;
use crate::ws::client::WsClient;
use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use strike_relay::{ClientId, ConnectionRegistry};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Handler for one streaming client.
pub struct WebSocketHandler {
    registry: Arc<ConnectionRegistry>,
    client_id: ClientId,
    client_buffer: usize,
    shutdown: watch::Receiver<bool>,
}

impl WebSocketHandler {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        client_buffer: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            registry,
            client_id: ClientId::new(),
            client_buffer,
            shutdown,
        }
    }

    /// Handle an upgraded WebSocket connection
    pub async fn handle(self, socket: WebSocket) {
        let (sink, stream) = socket.split();
        self.run(sink, stream).await;
    }

    /// Drive a connection given its two halves.
    pub async fn run<Tx, Rx, E>(mut self, sink: Tx, mut stream: Rx)
    where
        Tx: Sink<Message> + Unpin + Send + 'static,
        Tx::Error: fmt::Display + Send,
        Rx: Stream<Item = Result<Message, E>> + Unpin,
        E: fmt::Display,
    {
        let client_id = self.client_id;
        let (outbound_tx, outbound_rx) = mpsc::channel(self.client_buffer);
        let writer = tokio::spawn(write_loop(client_id, sink, outbound_rx));

        // The welcome is queued before registration so no broadcast can
        // overtake it.
        if outbound_tx
            .try_send(Message::Text(messages::welcome()))
            .is_ok()
        {
            self.registry
                .add(client_id, Arc::new(WsClient::new(outbound_tx.clone())));
            info!(
                client_id = %client_id,
                clients = self.registry.len(),
                "Streaming client connected"
            );

            loop {
                let next = tokio::select! {
                    _ = shutdown_requested(&mut self.shutdown) => {
                        debug!(client_id = %client_id, "Closing client for shutdown");
                        let _ = outbound_tx.send(Message::Close(None)).await;
                        break;
                    }
                    next = stream.next() => next,
                };

                match next {
                    Some(Ok(Message::Text(text))) => {
                        debug!(client_id = %client_id, len = text.len(), "Client message received");
                        let reply = Message::Text(messages::acknowledge(&text));
                        if outbound_tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(client_id = %client_id, "WebSocket close received");
                        break;
                    }
                    // Binary frames are ignored; ping/pong is answered by the transport.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(client_id = %client_id, error = %e, "WebSocket error");
                        let _ = outbound_tx.try_send(Message::Text(messages::transport_error()));
                        break;
                    }
                }
            }
        }

        self.registry.remove(&client_id);
        drop(outbound_tx);
        let _ = writer.await;

        info!(
            client_id = %client_id,
            clients = self.registry.len(),
            "Streaming client disconnected"
        );
    }
}

async fn write_loop<Tx>(client_id: ClientId, mut sink: Tx, mut outbound: mpsc::Receiver<Message>)
where
    Tx: Sink<Message> + Unpin,
    Tx::Error: fmt::Display,
{
    while let Some(message) = outbound.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            debug!(client_id = %client_id, error = %e, "Outbound write failed");
            break;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Resolves once shutdown is requested or can no longer be requested.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
