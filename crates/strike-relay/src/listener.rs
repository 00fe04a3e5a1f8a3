//! # Notification Listener
//!
//! The relay loop. Owns one subscription session at a time and drives it
//! through the listener state machine:
//!
//! - `Connecting`: open a fresh connection and subscribe to the channel,
//!   within `connect_timeout`.
//! - `Listening`: wait at most `wait_interval` for a notification and hand
//!   it to the pipeline before waiting again.
//! - `Probing`: the wait elapsed, check the connection with a trivial query
//!   bounded by `probe_timeout`.
//! - `Disconnected`: the session failed; sleep `reconnect_backoff`, then
//!   reconnect.
//!
//! The shutdown flag is checked before every transition and is raced against
//! the connect, the wait, the probe and the backoff sleep. Pipeline work for
//! a notification already received is always completed.

use crate::domain::{RelayConfig, RelayError};
use crate::pipeline::RelayPipeline;
use crate::ports::{NotificationSession, NotificationSource};
use crate::stats::RelayStats;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Where the relay loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Listening,
    Probing,
    /// The loop has exited after shutdown.
    Stopped,
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListenerState::Disconnected => "disconnected",
            ListenerState::Connecting => "connecting",
            ListenerState::Listening => "listening",
            ListenerState::Probing => "probing",
            ListenerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// How a session ended.
enum SessionEnd {
    Shutdown,
    Failed(RelayError),
}

/// Long-lived subscriber that feeds notifications into the relay pipeline.
pub struct NotificationListener<S: NotificationSource> {
    source: S,
    pipeline: RelayPipeline,
    config: RelayConfig,
    stats: Arc<RelayStats>,
    state_tx: watch::Sender<ListenerState>,
}

impl<S: NotificationSource> NotificationListener<S> {
    pub fn new(
        source: S,
        pipeline: RelayPipeline,
        config: RelayConfig,
        stats: Arc<RelayStats>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ListenerState::Disconnected);
        Self {
            source,
            pipeline,
            config,
            stats,
            state_tx,
        }
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.state_tx.subscribe()
    }

    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    /// Run until `shutdown` turns `true` (or its sender is dropped).
    ///
    /// Never returns an error: every session failure leads to a reconnect
    /// after the fixed backoff.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            channel = %self.config.channel,
            wait = ?self.config.wait_interval,
            backoff = ?self.config.reconnect_backoff,
            "Notification listener starting"
        );

        let mut attempt: u64 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }

            if attempt > 0 {
                self.stats.record_reconnect();
                info!(
                    attempt,
                    backoff = ?self.config.reconnect_backoff,
                    "Waiting before reconnect"
                );
                tokio::select! {
                    _ = shutdown_requested(&mut shutdown) => break,
                    _ = tokio::time::sleep(self.config.reconnect_backoff) => {}
                }
            }
            attempt += 1;

            match self.run_session(&mut shutdown).await {
                SessionEnd::Shutdown => break,
                SessionEnd::Failed(e) => {
                    self.set_state(ListenerState::Disconnected);
                    warn!(
                        error = %e,
                        session_fatal = e.is_session_fatal(),
                        "Subscription session torn down"
                    );
                }
            }
        }

        self.set_state(ListenerState::Stopped);
        info!("Shutdown observed, notification listener stopped");
    }

    async fn run_session(&self, shutdown: &mut watch::Receiver<bool>) -> SessionEnd {
        self.set_state(ListenerState::Connecting);
        let opened = tokio::select! {
            _ = shutdown_requested(shutdown) => return SessionEnd::Shutdown,
            opened = self.open_session() => opened,
        };
        let mut session = match opened {
            Ok(session) => session,
            Err(e) => return SessionEnd::Failed(e),
        };

        self.stats.record_session_opened();
        info!(channel = %self.config.channel, "Subscribed to notification channel");

        loop {
            if *shutdown.borrow() {
                return SessionEnd::Shutdown;
            }
            self.set_state(ListenerState::Listening);

            let next = tokio::select! {
                _ = shutdown_requested(shutdown) => return SessionEnd::Shutdown,
                next = session.next_notification(self.config.wait_interval) => next,
            };

            match next {
                Ok(Some(payload)) => {
                    self.pipeline.process(&payload).await;
                }
                Ok(None) => {
                    self.set_state(ListenerState::Probing);
                    let probed = tokio::select! {
                        _ = shutdown_requested(shutdown) => return SessionEnd::Shutdown,
                        probed = self.probe(&mut session) => probed,
                    };
                    if let Err(e) = probed {
                        self.stats.record_probe_failure();
                        warn!(error = %e, "Liveness probe failed");
                        return SessionEnd::Failed(e);
                    }
                }
                Err(e) => return SessionEnd::Failed(e),
            }
        }
    }

    /// Connect and subscribe, bounded by `connect_timeout`.
    async fn open_session(&self) -> Result<S::Session, RelayError> {
        let limit = self.config.connect_timeout;
        let opening = async {
            let mut session = self.source.connect().await?;
            session.subscribe(&self.config.channel).await?;
            Ok::<_, RelayError>(session)
        };
        tokio::time::timeout(limit, opening)
            .await
            .map_err(|_| RelayError::Connect(format!("timed out after {:?}", limit)))?
    }

    /// A probe that does not answer within `probe_timeout` counts as failed.
    async fn probe(&self, session: &mut S::Session) -> Result<(), RelayError> {
        let limit = self.config.probe_timeout;
        tokio::time::timeout(limit, session.probe())
            .await
            .map_err(|_| RelayError::Probe(format!("timed out after {:?}", limit)))?
    }

    fn set_state(&self, state: ListenerState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Listener state changed");
        }
    }
}

/// Resolves once shutdown is requested or can no longer be requested.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
