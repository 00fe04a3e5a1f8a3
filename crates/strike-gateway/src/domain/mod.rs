//! Gateway configuration, errors and the fixed client documents.

pub mod config;
pub mod error;
pub mod messages;

pub use config::GatewayConfig;
pub use error::GatewayError;
