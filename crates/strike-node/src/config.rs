//! Process configuration, read from the environment.
//!
//! The two PostgreSQL endpoints are required and have no defaults: a node
//! that cannot reach its store must not start. Everything else has a default
//! and an optional `STRIKE_*` override.

use std::net::SocketAddr;
use std::time::Duration;
use strike_gateway::GatewayConfig;
use strike_relay::adapters::PgEndpoint;
use strike_relay::{ConfigError, RelayConfig};

/// Direct connection used by the notification listener
pub const DIRECT_PREFIX: &str = "PGDIRECT";

/// Pooled connection used by lookups and the health endpoint
pub const POOLED_PREFIX: &str = "PGBOUNCER";

/// Default size of the lookup pool
pub const DEFAULT_POOL_SIZE: u32 = 5;

const ENDPOINT_KEYS: [&str; 5] = ["DB", "USER", "PASSWORD", "HOST", "PORT"];

/// Complete node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Dedicated LISTEN connection
    pub direct: PgEndpoint,
    /// Pooled read path
    pub pooled: PgEndpoint,
    /// Maximum connections in the lookup pool
    pub pool_size: u32,
    pub relay: RelayConfig,
    pub gateway: GatewayConfig,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl NodeConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// Every missing required key is reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let missing: Vec<String> = [DIRECT_PREFIX, POOLED_PREFIX]
            .iter()
            .flat_map(|prefix| ENDPOINT_KEYS.iter().map(move |key| format!("{}_{}", prefix, key)))
            .filter(|key| get(key.as_str()).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let direct = endpoint(&get, DIRECT_PREFIX)?;
        let pooled = endpoint(&get, POOLED_PREFIX)?;

        let mut relay = RelayConfig::default();
        if let Some(channel) = get("STRIKE_NOTIFY_CHANNEL") {
            relay.channel = channel;
        }
        if let Some(ms) = parse_opt::<u64>(&get, "STRIKE_WAIT_MS")? {
            relay.wait_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_opt::<u64>(&get, "STRIKE_BACKOFF_SECS")? {
            relay.reconnect_backoff = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_opt::<u64>(&get, "STRIKE_LOOKUP_TIMEOUT_MS")? {
            relay.lookup_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_opt::<u64>(&get, "STRIKE_PROBE_TIMEOUT_MS")? {
            relay.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_opt::<u64>(&get, "STRIKE_CONNECT_TIMEOUT_SECS")? {
            relay.connect_timeout = Duration::from_secs(secs);
        }
        relay.validate()?;

        let mut gateway = GatewayConfig::default();
        if let Some(addr) = parse_opt::<SocketAddr>(&get, "STRIKE_BIND_ADDR")? {
            gateway.bind_addr = addr;
        }
        gateway.validate()?;

        let pool_size = parse_opt::<u32>(&get, "STRIKE_POOL_SIZE")?.unwrap_or(DEFAULT_POOL_SIZE);
        if pool_size == 0 {
            return Err(invalid("STRIKE_POOL_SIZE", "must be greater than zero"));
        }

        let log_json = match get("STRIKE_LOG_JSON") {
            None => false,
            Some(value) => parse_flag(&value)
                .ok_or_else(|| invalid("STRIKE_LOG_JSON", "expected 1/0, true/false or yes/no"))?,
        };

        Ok(Self {
            direct,
            pooled,
            pool_size,
            relay,
            gateway,
            log_json,
        })
    }
}

fn endpoint<G>(get: &G, prefix: &str) -> Result<PgEndpoint, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let required = |key: &str| {
        let name = format!("{}_{}", prefix, key);
        get(name.as_str()).ok_or(ConfigError::Missing(vec![name]))
    };

    let port_key = format!("{}_PORT", prefix);
    let port = required("PORT")?
        .trim()
        .parse::<u16>()
        .map_err(|e| invalid(&port_key, &e.to_string()))?;

    Ok(PgEndpoint {
        host: required("HOST")?,
        port,
        database: required("DB")?,
        user: required("USER")?,
        password: required("PASSWORD")?,
    })
}

fn parse_opt<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| raw.trim().parse::<T>().map_err(|e| invalid(key, &e.to_string())))
        .transpose()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
