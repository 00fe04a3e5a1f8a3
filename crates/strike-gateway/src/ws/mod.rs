//! WebSocket module for the incident stream.
//!
//! Clients connect to `/mails`, receive a welcome document, then one document
//! per relayed incident until they disconnect.

pub mod client;
pub mod handler;

pub use client::WsClient;
pub use handler::WebSocketHandler;
