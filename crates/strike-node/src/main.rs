//! Strike node executable.

use anyhow::{Context, Result};
use std::sync::Arc;
use strike_node::{shutdown_signal, telemetry, NodeConfig, NodeRuntime};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Fail before anything starts if the environment is incomplete
    let config = NodeConfig::from_env().context("failed to load configuration")?;

    telemetry::init_tracing(config.log_json)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_addr = %config.gateway.bind_addr,
        channel = %config.relay.channel,
        direct = ?config.direct,
        pooled = ?config.pooled,
        "Starting strike node"
    );

    let runtime = Arc::new(NodeRuntime::new(config));

    let signals = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move {
            shutdown_signal().await;
            runtime.shutdown();
        })
    };

    runtime.run().await?;
    signals.abort();

    info!("Shutdown complete");
    Ok(())
}
