//! # Strike Node
//!
//! Wires the relay and the gateway together:
//!
//! ```text
//!   PGDIRECT_* ──→ PgNotificationSource ──→ NotificationListener ─┐
//!                                                                  │ RelayPipeline
//!   PGBOUNCER_* ─→ PgReferenceStore ──→ ReferenceEnricher ─────────┤
//!                        │                                         ↓
//!                        │                              BroadcastSink
//!                        │                                         ↓
//!                        └──→ /health ←── GatewayService ──→ ConnectionRegistry ←── /mails
//! ```
//!
//! One shutdown flag (a `watch` channel) stops both halves.

pub mod config;
pub mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use strike_gateway::{GatewayContext, GatewayService};
use strike_relay::adapters::{PgNotificationSource, PgReferenceStore};
use strike_relay::{
    BroadcastSink, ConnectionRegistry, NotificationListener, ReferenceEnricher, RelayPipeline,
    RelayStats, StoreStats,
};
use tokio::sync::watch;
use tracing::{error, info, warn};

pub use config::NodeConfig;

/// The running process: relay loop plus streaming gateway.
pub struct NodeRuntime {
    config: NodeConfig,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Raise the shutdown flag. Idempotent.
    pub fn shutdown(&self) {
        if !self.shutdown_tx.send_replace(true) {
            info!("Initiating graceful shutdown...");
        }
    }

    /// Run until shutdown, then wait for the relay loop to exit.
    pub async fn run(&self) -> Result<()> {
        let config = &self.config;

        let store = Arc::new(PgReferenceStore::connect_lazy(
            &config.pooled,
            config.pool_size,
        ));
        let registry = Arc::new(ConnectionRegistry::new());
        let stats = Arc::new(RelayStats::new());

        let pipeline = RelayPipeline::new(
            ReferenceEnricher::new(Arc::clone(&store) as _, config.relay.lookup_timeout),
            BroadcastSink::new(Arc::clone(&registry), Arc::clone(&stats)),
            Arc::clone(&stats),
        );
        let listener = NotificationListener::new(
            PgNotificationSource::new(config.direct.clone()),
            pipeline,
            config.relay.clone(),
            Arc::clone(&stats),
        );

        let gateway = GatewayService::new(
            config.gateway.clone(),
            GatewayContext {
                registry,
                store: store as Arc<dyn StoreStats>,
                relay_state: listener.state(),
                relay_stats: stats,
            },
        )
        .context("invalid gateway configuration")?;

        let relay = tokio::spawn(listener.run(self.shutdown_rx.clone()));

        let served = gateway.serve(self.shutdown_rx.clone()).await;
        if let Err(e) = &served {
            error!(error = %e, "Gateway failed, stopping relay");
            self.shutdown();
        }

        if let Err(e) = relay.await {
            warn!(error = %e, "Relay task ended abnormally");
        }
        served.context("gateway stopped with an error")
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
