//! Integration flows across the relay and gateway crates.

pub mod relay_flows;
pub mod streaming;
