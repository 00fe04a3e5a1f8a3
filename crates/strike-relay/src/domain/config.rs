//! Relay configuration with validation.

use std::time::Duration;

/// Relay loop configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Notification channel to LISTEN on
    pub channel: String,
    /// Bounded wait for a notification before probing the session
    pub wait_interval: Duration,
    /// Fixed delay before reconnecting after a session failure
    pub reconnect_backoff: Duration,
    /// Upper bound for a single reference-data lookup
    pub lookup_timeout: Duration,
    /// Upper bound for opening and subscribing a session
    pub connect_timeout: Duration,
    /// Upper bound for the liveness probe on an idle session
    pub probe_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel: crate::DEFAULT_CHANNEL.to_string(),
            wait_interval: Duration::from_secs(1),
            reconnect_backoff: Duration::from_secs(5),
            lookup_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl RelayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // LISTEN takes an identifier, not a bind parameter, so the name is
        // restricted to what can be sent unquoted.
        let mut chars = self.channel.chars();
        let valid_start = chars
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
        if !valid_start
            || self.channel.len() > 63
            || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidChannel(self.channel.clone()));
        }

        if self.wait_interval.is_zero() {
            return Err(ConfigError::InvalidDuration("wait_interval"));
        }
        if self.reconnect_backoff.is_zero() {
            return Err(ConfigError::InvalidDuration("reconnect_backoff"));
        }
        if self.lookup_timeout.is_zero() {
            return Err(ConfigError::InvalidDuration("lookup_timeout"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidDuration("connect_timeout"));
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::InvalidDuration("probe_timeout"));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Channel name is not a plain SQL identifier
    #[error("invalid notification channel: '{0}'")]
    InvalidChannel(String),
    /// A duration that must be positive is zero
    #[error("invalid duration: {0} must be greater than zero")]
    InvalidDuration(&'static str),
    /// Required setting absent from the environment
    #[error("missing required setting(s): {}", .0.join(", "))]
    Missing(Vec<String>),
    /// Setting present but unparseable
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
