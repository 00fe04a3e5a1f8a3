//! # Alpha-Strike Test Suite
//!
//! Cross-crate flows that unit tests inside each crate cannot cover.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── relay_flows.rs   # notification → enrichment → registry fan-out
//!     └── streaming.rs     # real /mails WebSocket clients against the gateway
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p strike-tests
//! cargo test -p strike-tests integration::streaming::
//! ```

pub mod integration;
