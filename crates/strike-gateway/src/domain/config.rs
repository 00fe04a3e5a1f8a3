//! Gateway configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use strike_relay::ConfigError;

/// Default outbound queue depth per streaming client
pub const DEFAULT_CLIENT_BUFFER: usize = 256;

/// Default maximum inbound WebSocket message size (64 KiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Streaming gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Outbound frames buffered per client before sends count as failed
    pub client_buffer: usize,
    /// Largest inbound message accepted from a client
    pub max_message_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            client_buffer: DEFAULT_CLIENT_BUFFER,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "client_buffer".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_message_size".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}
