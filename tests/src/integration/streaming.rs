//! # Streaming
//!
//! Real WebSocket clients against a gateway bound on a loopback port, with
//! the relay fed from a scripted notification source.
//!
//! ## Flows Tested:
//!
//! 1. **Handshake**: welcome document, then an acknowledgement per message
//! 2. **Live fan-out**: relayed events reach every open stream byte-identical
//! 3. **Disconnect**: a client closing its stream leaves the registry
//! 4. **Shutdown**: open streams are closed and the server task ends
//! 5. **Health**: plain HTTP on the same listener

#[cfg(test)]
mod tests {
    use futures::{SinkExt, StreamExt};
    use serde_json::Value;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::watch;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    use strike_gateway::domain::messages::{ACKNOWLEDGE_MESSAGE, WELCOME_MESSAGE};
    use strike_gateway::service::HEALTH_MESSAGE;
    use strike_gateway::{GatewayConfig, GatewayContext, GatewayError, GatewayService};
    use strike_relay::testing::{incident_payload, InMemoryStore, ScriptedSource, SessionStep};
    use strike_relay::{
        BroadcastSink, ConnectionRegistry, EnrichedEvent, ListenerState, NotificationListener,
        ReferenceEnricher, RelayConfig, RelayPipeline, RelayStats,
    };

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const STEP_TIMEOUT: Duration = Duration::from_secs(5);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Node {
        addr: SocketAddr,
        registry: Arc<ConnectionRegistry>,
        store: Arc<InMemoryStore>,
        stats: Arc<RelayStats>,
        relay_state: watch::Receiver<ListenerState>,
        _relay_state_tx: watch::Sender<ListenerState>,
        shutdown_tx: watch::Sender<bool>,
        server: JoinHandle<Result<(), GatewayError>>,
    }

    async fn start_gateway() -> Node {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = Arc::new(InMemoryStore::new());
        store.add_character(1, "Vex", "a1b2c3");
        store.add_character(2, "Rook", "d4e5f6");
        store.add_system(30000142, "Jita");
        let stats = Arc::new(RelayStats::new());
        let (relay_state_tx, relay_state) = watch::channel(ListenerState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let context = GatewayContext {
            registry: Arc::clone(&registry),
            store: Arc::clone(&store) as _,
            relay_state: relay_state.clone(),
            relay_stats: Arc::clone(&stats),
        };
        let service = GatewayService::new(GatewayConfig::default(), context).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(service.serve_on(listener, shutdown_rx));

        Node {
            addr,
            registry,
            store,
            stats,
            relay_state,
            _relay_state_tx: relay_state_tx,
            shutdown_tx,
            server,
        }
    }

    impl Node {
        /// Run a listener over `source` that publishes into this gateway's registry.
        fn start_relay(&self, source: ScriptedSource) -> JoinHandle<()> {
            let config = RelayConfig::default();
            let pipeline = RelayPipeline::new(
                ReferenceEnricher::new(Arc::clone(&self.store) as _, config.lookup_timeout),
                BroadcastSink::new(Arc::clone(&self.registry), Arc::clone(&self.stats)),
                Arc::clone(&self.stats),
            );
            let listener =
                NotificationListener::new(source, pipeline, config, Arc::clone(&self.stats));
            let shutdown = self.shutdown_tx.subscribe();
            tokio::spawn(listener.run(shutdown))
        }

        /// Open a stream and consume the welcome document.
        async fn connect(&self) -> Client {
            let url = format!("ws://{}/mails", self.addr);
            let (mut ws, _) = tokio::time::timeout(STEP_TIMEOUT, connect_async(url.as_str()))
                .await
                .expect("connect timed out")
                .unwrap();
            let welcome = next_json(&mut ws).await.expect("no welcome");
            assert_eq!(welcome["message"], WELCOME_MESSAGE);
            ws
        }

        async fn wait_for_clients(&self, n: usize) {
            tokio::time::timeout(STEP_TIMEOUT, async {
                while self.registry.len() != n {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .expect("registry never reached expected size");
        }

        async fn stop(self) {
            self.shutdown_tx.send_replace(true);
            tokio::time::timeout(STEP_TIMEOUT, self.server)
                .await
                .expect("gateway did not stop")
                .unwrap()
                .unwrap();
        }
    }

    /// Next text frame, skipping control frames. `None` once the stream closes.
    async fn next_text(ws: &mut Client) -> Option<String> {
        loop {
            let frame = tokio::time::timeout(STEP_TIMEOUT, ws.next())
                .await
                .expect("no frame before timeout")?;
            match frame {
                Ok(Message::Text(text)) => return Some(text.as_str().to_string()),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    async fn next_json(ws: &mut Client) -> Option<Value> {
        next_text(ws)
            .await
            .map(|text| serde_json::from_str(&text).unwrap())
    }

    // =============================================================================
    // HANDSHAKE
    // =============================================================================

    #[tokio::test]
    async fn test_welcome_then_acknowledgement() {
        let node = start_gateway().await;
        let mut ws = node.connect().await;

        ws.send(Message::text("anyone there?")).await.unwrap();
        let ack = next_json(&mut ws).await.unwrap();

        assert_eq!(ack["message"], ACKNOWLEDGE_MESSAGE);
        assert_eq!(ack["echo"], "anyone there?");
        node.stop().await;
    }

    // =============================================================================
    // LIVE FAN-OUT
    // =============================================================================

    #[tokio::test]
    async fn test_relayed_events_reach_every_stream() {
        let node = start_gateway().await;
        let mut first = node.connect().await;
        let mut second = node.connect().await;
        node.wait_for_clients(2).await;

        let source = ScriptedSource::new();
        source.push_session(vec![
            SessionStep::Notify(incident_payload(
                41,
                Some(1),
                Some(2),
                Some(30000142),
                1_700_000_000,
            )),
            SessionStep::Notify(incident_payload(42, Some(2), None, None, 1_700_000_060)),
        ]);
        let relay = node.start_relay(source);

        let mut a = Vec::new();
        let mut b = Vec::new();
        for _ in 0..2 {
            a.push(next_text(&mut first).await.unwrap());
            b.push(next_text(&mut second).await.unwrap());
        }
        assert_eq!(a, b);

        let first_event: EnrichedEvent = serde_json::from_str(&a[0]).unwrap();
        assert_eq!(first_event.id, 41);
        assert_eq!(first_event.victim_name, "Vex");
        assert_eq!(first_event.killer_name, "Rook");
        assert_eq!(first_event.solar_system_name, "Jita");

        let second_event: EnrichedEvent = serde_json::from_str(&a[1]).unwrap();
        assert_eq!(second_event.id, 42);
        assert_eq!(second_event.killer_name, "");

        node.stop().await;
        tokio::time::timeout(STEP_TIMEOUT, relay)
            .await
            .expect("relay did not stop")
            .unwrap();
    }

    // =============================================================================
    // DISCONNECT
    // =============================================================================

    #[tokio::test]
    async fn test_client_close_leaves_registry() {
        let node = start_gateway().await;
        let mut leaving = node.connect().await;
        let _staying = node.connect().await;
        node.wait_for_clients(2).await;

        leaving.close(None).await.unwrap();
        node.wait_for_clients(1).await;

        node.stop().await;
    }

    // =============================================================================
    // SHUTDOWN
    // =============================================================================

    #[tokio::test]
    async fn test_shutdown_closes_open_streams() {
        let node = start_gateway().await;
        let mut first = node.connect().await;
        let mut second = node.connect().await;
        node.wait_for_clients(2).await;
        let registry = Arc::clone(&node.registry);

        node.stop().await;

        assert!(next_text(&mut first).await.is_none());
        assert!(next_text(&mut second).await.is_none());
        // Handlers unregister after their close frame goes out
        tokio::time::timeout(STEP_TIMEOUT, async {
            while !registry.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("handlers never unregistered");
    }

    // =============================================================================
    // HEALTH
    // =============================================================================

    #[tokio::test]
    async fn test_health_over_http() {
        let node = start_gateway().await;
        node.store.set_incident_count(7);
        let _ws = node.connect().await;
        assert_eq!(*node.relay_state.borrow(), ListenerState::Disconnected);

        let mut stream = TcpStream::connect(node.addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        tokio::time::timeout(STEP_TIMEOUT, stream.read_to_string(&mut response))
            .await
            .expect("health timed out")
            .unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        let body = response.split("\r\n\r\n").nth(1).unwrap();
        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["health"], HEALTH_MESSAGE);
        assert_eq!(body["player_count"], 2);
        assert_eq!(body["incident_count"], 7);
        assert_eq!(body["relay_state"], "disconnected");
        assert_eq!(body["clients"], 1);

        node.stop().await;
    }
}
