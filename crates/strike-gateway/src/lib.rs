//! # Strike Gateway - Streaming Transport
//!
//! HTTP server for the incident stream.
//!
//! ```text
//!   browser / bot ──ws──→ /mails ──→ WebSocketHandler ──add/remove──→ ConnectionRegistry
//!                                        ↑ writer task                       │
//!                                        └──────── bounded queue ←── broadcast (relay)
//!
//!   monitoring ──http──→ /health ──→ StoreStats + relay state + registry size
//! ```
//!
//! The registry is the only state shared with the relay. Connections add
//! themselves on upgrade and remove themselves when their read loop ends.

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod service;
pub mod ws;

pub use domain::{GatewayConfig, GatewayError};
pub use service::{GatewayContext, GatewayService};
pub use ws::{WebSocketHandler, WsClient};
