//! Test doubles for the relay ports.
//!
//! Available to this crate's unit tests and, through the `test-utils`
//! feature, to the gateway and the integration suite.

use crate::domain::{affiliation_at, CharacterRecord, Membership, RelayError};
use crate::ports::{
    ClientHandle, ClientSendError, NotificationSession, NotificationSource, ReferenceLookup,
    StoreCounts, StoreStats,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Build a notification body the way the insert trigger emits it.
pub fn incident_payload(
    id: i64,
    victim_id: Option<i64>,
    killer_id: Option<i64>,
    solar_system_id: Option<i64>,
    time_stamp: i64,
) -> String {
    serde_json::json!({
        "id": id,
        "victim_id": victim_id,
        "killer_id": killer_id,
        "loss_type": 0,
        "solar_system_id": solar_system_id,
        "time_stamp": time_stamp,
    })
    .to_string()
}

// =============================================================================
// Reference store
// =============================================================================

/// In-memory reference data applying the same time-scoped affiliation rule
/// as the PostgreSQL adapter.
#[derive(Default)]
pub struct InMemoryStore {
    characters: Mutex<HashMap<i64, (String, String)>>,
    memberships: Mutex<HashMap<i64, Vec<Membership>>>,
    systems: Mutex<HashMap<i64, String>>,
    incidents: AtomicI64,
    fail_characters: AtomicBool,
    fail_systems: AtomicBool,
    fail_counts: AtomicBool,
    character_delay: Mutex<Option<Duration>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_character(&self, id: i64, name: &str, address: &str) {
        self.characters
            .lock()
            .insert(id, (name.to_string(), address.to_string()));
    }

    pub fn add_membership(&self, character_id: i64, membership: Membership) {
        self.memberships
            .lock()
            .entry(character_id)
            .or_default()
            .push(membership);
    }

    pub fn add_system(&self, id: i64, name: &str) {
        self.systems.lock().insert(id, name.to_string());
    }

    pub fn set_incident_count(&self, count: i64) {
        self.incidents.store(count, Ordering::SeqCst);
    }

    pub fn fail_character_lookups(&self, fail: bool) {
        self.fail_characters.store(fail, Ordering::SeqCst);
    }

    pub fn fail_system_lookups(&self, fail: bool) {
        self.fail_systems.store(fail, Ordering::SeqCst);
    }

    pub fn fail_counts(&self, fail: bool) {
        self.fail_counts.store(fail, Ordering::SeqCst);
    }

    /// Delay every character lookup, e.g. to exercise the lookup timeout.
    pub fn set_character_delay(&self, delay: Duration) {
        *self.character_delay.lock() = Some(delay);
    }
}

#[async_trait]
impl ReferenceLookup for InMemoryStore {
    async fn character_at(
        &self,
        character_id: i64,
        at: i64,
    ) -> Result<Option<CharacterRecord>, RelayError> {
        let delay = *self.character_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_characters.load(Ordering::SeqCst) {
            return Err(RelayError::Lookup("character lookup disabled".into()));
        }

        let Some((name, address)) = self.characters.lock().get(&character_id).cloned() else {
            return Ok(None);
        };
        let affiliation = self
            .memberships
            .lock()
            .get(&character_id)
            .and_then(|history| affiliation_at(history, at))
            .map(|m| m.tribe_name.clone());

        Ok(Some(CharacterRecord {
            name,
            address,
            affiliation,
        }))
    }

    async fn system_name(&self, system_id: i64) -> Result<Option<String>, RelayError> {
        if self.fail_systems.load(Ordering::SeqCst) {
            return Err(RelayError::Lookup("system lookup disabled".into()));
        }
        Ok(self.systems.lock().get(&system_id).cloned())
    }
}

#[async_trait]
impl StoreStats for InMemoryStore {
    async fn counts(&self) -> Result<StoreCounts, RelayError> {
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(RelayError::Lookup("count query disabled".into()));
        }
        Ok(StoreCounts {
            characters: self.characters.lock().len() as i64,
            incidents: self.incidents.load(Ordering::SeqCst),
        })
    }
}

// =============================================================================
// Notification source
// =============================================================================

/// One scripted step of a subscription session.
#[derive(Debug, Clone)]
pub enum SessionStep {
    /// Deliver a payload immediately.
    Notify(String),
    /// Let the bounded wait elapse.
    Idle,
    /// Let the wait elapse and fail the following probe.
    IdleThenProbeFails,
    /// Let the wait elapse; the following probe never answers.
    IdleThenProbeHangs,
    /// Fail the wait as a lost connection.
    Drop,
}

#[derive(Debug)]
enum ConnectScript {
    Session(Vec<SessionStep>),
    ConnectFails(String),
    ConnectHangs,
    SubscribeFails(String),
}

#[derive(Default)]
struct ScriptLog {
    script: VecDeque<ConnectScript>,
    attempts: Vec<Instant>,
    subscribed: Vec<String>,
    probes: usize,
}

/// Notification source driven by a script of connect outcomes.
///
/// Once the script is exhausted every connect succeeds with a session that
/// stays idle forever.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    log: Arc<Mutex<ScriptLog>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_session(&self, steps: Vec<SessionStep>) {
        self.log
            .lock()
            .script
            .push_back(ConnectScript::Session(steps));
    }

    pub fn push_connect_failure(&self, reason: &str) {
        self.log
            .lock()
            .script
            .push_back(ConnectScript::ConnectFails(reason.to_string()));
    }

    /// The next connect never completes.
    pub fn push_connect_hang(&self) {
        self.log.lock().script.push_back(ConnectScript::ConnectHangs);
    }

    pub fn push_subscribe_failure(&self, reason: &str) {
        self.log
            .lock()
            .script
            .push_back(ConnectScript::SubscribeFails(reason.to_string()));
    }

    /// Instants of every connect attempt, in order.
    pub fn connect_attempts(&self) -> Vec<Instant> {
        self.log.lock().attempts.clone()
    }

    pub fn subscribed_channels(&self) -> Vec<String> {
        self.log.lock().subscribed.clone()
    }

    pub fn probe_count(&self) -> usize {
        self.log.lock().probes
    }

    /// Wait until at least `n` connect attempts were made.
    pub async fn wait_for_connects(&self, n: usize) {
        while self.log.lock().attempts.len() < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl NotificationSource for ScriptedSource {
    type Session = ScriptedSession;

    async fn connect(&self) -> Result<ScriptedSession, RelayError> {
        let next = {
            let mut log = self.log.lock();
            log.attempts.push(Instant::now());
            log.script.pop_front()
        };

        let (steps, subscribe_error) = match next {
            Some(ConnectScript::ConnectFails(reason)) => return Err(RelayError::Connect(reason)),
            Some(ConnectScript::ConnectHangs) => std::future::pending().await,
            Some(ConnectScript::SubscribeFails(reason)) => (VecDeque::new(), Some(reason)),
            Some(ConnectScript::Session(steps)) => (steps.into(), None),
            None => (VecDeque::new(), None),
        };

        Ok(ScriptedSession {
            steps,
            subscribe_error,
            probe: ProbeOutcome::Answers,
            log: Arc::clone(&self.log),
        })
    }
}

/// Session handed out by [`ScriptedSource`].
pub struct ScriptedSession {
    steps: VecDeque<SessionStep>,
    subscribe_error: Option<String>,
    probe: ProbeOutcome,
    log: Arc<Mutex<ScriptLog>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeOutcome {
    Answers,
    Fails,
    Hangs,
}

#[async_trait]
impl NotificationSession for ScriptedSession {
    async fn subscribe(&mut self, channel: &str) -> Result<(), RelayError> {
        if let Some(reason) = self.subscribe_error.take() {
            return Err(RelayError::Subscribe {
                channel: channel.to_string(),
                reason,
            });
        }
        self.log.lock().subscribed.push(channel.to_string());
        Ok(())
    }

    async fn next_notification(&mut self, wait: Duration) -> Result<Option<String>, RelayError> {
        match self.steps.pop_front() {
            Some(SessionStep::Notify(payload)) => Ok(Some(payload)),
            Some(SessionStep::Drop) => Err(RelayError::ConnectionLost("scripted drop".into())),
            Some(SessionStep::IdleThenProbeFails) => {
                self.probe = ProbeOutcome::Fails;
                tokio::time::sleep(wait).await;
                Ok(None)
            }
            Some(SessionStep::IdleThenProbeHangs) => {
                self.probe = ProbeOutcome::Hangs;
                tokio::time::sleep(wait).await;
                Ok(None)
            }
            Some(SessionStep::Idle) | None => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
        }
    }

    async fn probe(&mut self) -> Result<(), RelayError> {
        self.log.lock().probes += 1;
        match self.probe {
            ProbeOutcome::Answers => Ok(()),
            ProbeOutcome::Fails => Err(RelayError::Probe("scripted probe failure".into())),
            ProbeOutcome::Hangs => std::future::pending().await,
        }
    }
}

// =============================================================================
// Streaming client
// =============================================================================

/// Client handle that records every frame it is sent.
#[derive(Default)]
pub struct RecordingClient {
    frames: Mutex<Vec<String>>,
    failure: Mutex<Option<ClientSendError>>,
    attempts: AtomicUsize,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every send fails with `error`.
    pub fn failing(error: ClientSendError) -> Self {
        let client = Self::default();
        client.set_failure(Some(error));
        client
    }

    pub fn set_failure(&self, error: Option<ClientSendError>) {
        *self.failure.lock() = error;
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    /// Send attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` frames were received and return them.
    pub async fn wait_for_frames(&self, n: usize) -> Vec<String> {
        loop {
            let frames = self.frames();
            if frames.len() >= n {
                return frames;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl ClientHandle for RecordingClient {
    async fn send_text(&self, frame: Arc<str>) -> Result<(), ClientSendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.frames.lock().push(frame.to_string());
        Ok(())
    }
}
