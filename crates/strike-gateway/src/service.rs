//! Gateway service: HTTP server carrying the `/mails` stream and `/health`.

use crate::domain::{GatewayConfig, GatewayError};
use crate::ws::WebSocketHandler;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use strike_relay::{ConnectionRegistry, ListenerState, RelayStats, StoreStats};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Health document status line
pub const HEALTH_MESSAGE: &str = "I'm alive!";

/// Everything the gateway shares with the relay.
#[derive(Clone)]
pub struct GatewayContext {
    pub registry: Arc<ConnectionRegistry>,
    pub store: Arc<dyn StoreStats>,
    pub relay_state: watch::Receiver<ListenerState>,
    pub relay_stats: Arc<RelayStats>,
}

/// Streaming gateway service
pub struct GatewayService {
    config: GatewayConfig,
    context: GatewayContext,
}

impl GatewayService {
    /// Create a new gateway service
    pub fn new(config: GatewayConfig, context: GatewayContext) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self { config, context })
    }

    /// Build the router. Open streams close when `shutdown` turns `true`.
    pub fn build_router(&self, shutdown: watch::Receiver<bool>) -> Router {
        let state = AppState {
            context: self.context.clone(),
            client_buffer: self.config.client_buffer,
            max_message_size: self.config.max_message_size,
            shutdown,
        };

        Router::new()
            .route("/mails", get(mails))
            .route("/health", get(health_check))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> Result<(), GatewayError> {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{}: {}", addr, e)))?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve_on(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), GatewayError> {
        let router = self.build_router(shutdown.clone());
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        info!(addr = %addr, "Gateway listening");

        let mut shutdown = shutdown;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await
            .map_err(|e| GatewayError::Serve(e.to_string()))?;

        info!("Gateway stopped");
        Ok(())
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    context: GatewayContext,
    client_buffer: usize,
    max_message_size: usize,
    shutdown: watch::Receiver<bool>,
}

/// Upgrade to the incident stream
async fn mails(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let handler = WebSocketHandler::new(
        Arc::clone(&state.context.registry),
        state.client_buffer,
        state.shutdown.clone(),
    );
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handler.handle(socket))
}

/// Liveness plus store and relay counters
async fn health_check(State(state): State<AppState>) -> Response {
    match state.context.store.counts().await {
        Ok(counts) => {
            let relay_state = *state.context.relay_state.borrow();
            Json(serde_json::json!({
                "health": HEALTH_MESSAGE,
                "player_count": counts.characters,
                "incident_count": counts.incidents,
                "relay_state": relay_state,
                "clients": state.context.registry.len(),
                "relay": state.context.relay_stats.snapshot(),
            }))
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal Server Error!" })),
            )
                .into_response()
        }
    }
}
