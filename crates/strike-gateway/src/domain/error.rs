//! Gateway error types.

use thiserror::Error;

/// Errors that stop the gateway from serving.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] strike_relay::ConfigError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// The HTTP server stopped with an I/O error
    #[error("server error: {0}")]
    Serve(String),
}
