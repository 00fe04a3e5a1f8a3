//! # Relay Flows
//!
//! Notification source → listener → enricher → normalizer → sink → registry,
//! with in-memory doubles for the store, the channel and the clients.
//!
//! ## Flows Tested:
//!
//! 1. **Fan-out**: every registered client receives the same bytes, in order
//! 2. **Degraded enrichment**: unresolvable references still produce an event
//! 3. **Recovery**: a dropped session reconnects after the fixed backoff and
//!    later events are delivered exactly once
//! 4. **Client churn**: clients joining or leaving between events

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use tokio::task::JoinHandle;

    use strike_relay::domain::{Membership, NO_AFFILIATION_LABEL, STRUCTURE_LOSS_LABEL};
    use strike_relay::testing::{
        incident_payload, InMemoryStore, RecordingClient, ScriptedSource, SessionStep,
    };
    use strike_relay::{
        BroadcastSink, ClientHandle, ClientId, ClientSendError, ConnectionRegistry, EnrichedEvent,
        ListenerState, NotificationListener, ReferenceEnricher, RelayConfig, RelayPipeline,
        RelayStats,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const JITA: i64 = 30000142;

    /// Reference data: two characters, one with a tribe history, one system
    fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.add_character(1, "Vex", "a1b2c3");
        store.add_membership(1, Membership::new("Fire Ants", 10, Some(50)));
        store.add_membership(1, Membership::new("Deep Core", 50, None));
        store.add_character(2, "Rook", "d4e5f6");
        store.add_system(JITA, "Jita");
        store
    }

    struct Relay {
        registry: Arc<ConnectionRegistry>,
        stats: Arc<RelayStats>,
        state: watch::Receiver<ListenerState>,
        shutdown_tx: watch::Sender<bool>,
        handle: JoinHandle<()>,
    }

    fn start_relay(source: ScriptedSource, store: Arc<InMemoryStore>) -> Relay {
        let registry = Arc::new(ConnectionRegistry::new());
        let stats = Arc::new(RelayStats::new());
        let config = RelayConfig::default();

        let pipeline = RelayPipeline::new(
            ReferenceEnricher::new(store, config.lookup_timeout),
            BroadcastSink::new(Arc::clone(&registry), Arc::clone(&stats)),
            Arc::clone(&stats),
        );
        let listener = NotificationListener::new(source, pipeline, config, Arc::clone(&stats));
        let state = listener.state();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(listener.run(shutdown_rx));

        Relay {
            registry,
            stats,
            state,
            shutdown_tx,
            handle,
        }
    }

    impl Relay {
        fn attach(&self) -> Arc<RecordingClient> {
            let client = Arc::new(RecordingClient::new());
            self.registry
                .add(ClientId::new(), Arc::clone(&client) as Arc<dyn ClientHandle>);
            client
        }

        async fn stop(self) -> Arc<RelayStats> {
            self.shutdown_tx.send(true).unwrap();
            tokio::time::timeout(Duration::from_secs(1), self.handle)
                .await
                .expect("relay did not stop")
                .unwrap();
            assert_eq!(*self.state.borrow(), ListenerState::Stopped);
            self.stats
        }
    }

    fn decode(frames: &[String]) -> Vec<EnrichedEvent> {
        frames
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    // =============================================================================
    // FAN-OUT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_every_client_receives_identical_bytes_in_order() {
        let source = ScriptedSource::new();
        source.push_session(vec![
            SessionStep::Idle,
            SessionStep::Notify(incident_payload(100, Some(1), Some(2), Some(JITA), 30)),
            SessionStep::Notify(incident_payload(101, Some(2), Some(1), Some(JITA), 60)),
            SessionStep::Notify(incident_payload(102, Some(1), None, None, 5)),
        ]);
        let relay = start_relay(source, seeded_store());
        let clients: Vec<_> = (0..4).map(|_| relay.attach()).collect();
        let broken = Arc::new(RecordingClient::failing(ClientSendError::Backpressure));
        relay
            .registry
            .add(ClientId::new(), Arc::clone(&broken) as Arc<dyn ClientHandle>);

        let reference = clients[0].wait_for_frames(3).await;
        for client in &clients[1..] {
            assert_eq!(client.wait_for_frames(3).await, reference);
        }
        assert_eq!(broken.attempts(), 3);

        let events = decode(&reference);
        assert_eq!(
            events.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![100, 101, 102]
        );

        // Tribe at event time
        assert_eq!(events[0].victim_tribe_name, "Fire Ants");
        assert_eq!(events[1].killer_tribe_name, "Deep Core");
        assert_eq!(events[2].victim_tribe_name, NO_AFFILIATION_LABEL);
        assert_eq!(events[0].loss_type, STRUCTURE_LOSS_LABEL);

        let stats = relay.stop().await;
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.events_published, 3);
        assert_eq!(snapshot.deliveries, 12);
        assert_eq!(snapshot.delivery_failures, 3);
    }

    // =============================================================================
    // DEGRADED ENRICHMENT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_unresolved_references_still_deliver() {
        let store = seeded_store();
        store.fail_system_lookups(true);
        let source = ScriptedSource::new();
        source.push_session(vec![
            SessionStep::Notify(incident_payload(7, Some(1), Some(999), Some(JITA), 60)),
        ]);
        let relay = start_relay(source, store);
        let client = relay.attach();

        let events = decode(&client.wait_for_frames(1).await);

        assert_eq!(events[0].victim_name, "Vex");
        assert_eq!(events[0].victim_address, "a1b2c3");
        assert_eq!(events[0].killer_name, "");
        assert_eq!(events[0].killer_tribe_name, "");
        assert_eq!(events[0].solar_system_id, Some(JITA));
        assert_eq!(events[0].solar_system_name, "");
        relay.stop().await;
    }

    // =============================================================================
    // RECOVERY
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_session_loss_recovers_without_duplicates() {
        let source = ScriptedSource::new();
        source.push_session(vec![
            SessionStep::Notify(incident_payload(1, Some(1), None, None, 60)),
            SessionStep::Drop,
        ]);
        source.push_connect_failure("database restarting");
        source.push_session(vec![
            SessionStep::Notify(incident_payload(2, Some(2), None, None, 61)),
            SessionStep::IdleThenProbeFails,
        ]);
        source.push_session(vec![SessionStep::Notify(incident_payload(
            3,
            Some(1),
            None,
            None,
            62,
        ))]);
        let relay = start_relay(source.clone(), seeded_store());
        let client = relay.attach();

        let events = decode(&client.wait_for_frames(3).await);
        assert_eq!(
            events.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let attempts = source.connect_attempts();
        assert_eq!(attempts.len(), 4);
        let backoff = RelayConfig::default().reconnect_backoff;
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= backoff);
        }

        let snapshot = relay.stop().await.snapshot();
        assert_eq!(snapshot.reconnects, 3);
        assert_eq!(snapshot.probe_failures, 1);
        assert_eq!(snapshot.sessions_opened, 3);
        assert_eq!(client.frames().len(), 3);
    }

    // =============================================================================
    // CLIENT CHURN
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_clients_only_see_events_while_registered() {
        let source = ScriptedSource::new();
        source.push_session(vec![
            SessionStep::Notify(incident_payload(1, None, None, None, 10)),
            SessionStep::Idle,
            SessionStep::Notify(incident_payload(2, None, None, None, 11)),
        ]);
        let relay = start_relay(source, seeded_store());

        let early = Arc::new(RecordingClient::new());
        let early_id = ClientId::new();
        relay
            .registry
            .add(early_id, Arc::clone(&early) as Arc<dyn ClientHandle>);

        early.wait_for_frames(1).await;
        relay.registry.remove(&early_id);
        let late = relay.attach();

        late.wait_for_frames(1).await;
        assert_eq!(decode(&early.frames())[0].id, 1);
        assert_eq!(early.frames().len(), 1);
        assert_eq!(decode(&late.frames())[0].id, 2);
        relay.stop().await;
    }
}
