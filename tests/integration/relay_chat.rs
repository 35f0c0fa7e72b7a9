//! End-to-end chat through an in-process relay over real WebSockets.
//!
//! Each client is a `Lifecycle` driven by `spawn_net`, exactly as the TUI
//! wires it. Verifies:
//! - both sides see a message, the sender as its own (relay echo)
//! - a client with another secret sees the placeholder
//! - with echo disabled only the other clients receive the frame
//! - relay shutdown and unreachable servers end in `Closed`

use std::sync::Arc;
use std::time::Duration;

use saltchat::lifecycle::{
    ChatBody, ConnectionState, Lifecycle, LogEntry, NOTICE_CONNECTED, Origin, SendOutcome,
    UNDECRYPTABLE_PLACEHOLDER,
};
use saltchat::net::{self, NetConfig, NetEvent};
use saltchat_relay::relay::{self, DEFAULT_MAX_FRAME_SIZE, RelayState};
use tokio::sync::mpsc;

struct Client {
    lifecycle: Lifecycle,
    events: mpsc::Receiver<NetEvent>,
}

impl Client {
    fn start(url: &str, name: &str, secret: &str) -> Self {
        let mut lifecycle = Lifecycle::new();
        lifecycle.start(name, secret).expect("valid credentials");
        let mut config = NetConfig::new(url.to_string());
        config.connect_timeout = Duration::from_secs(2);
        let (cmd_tx, events) = net::spawn_net(config);
        lifecycle.attach(cmd_tx);
        Self { lifecycle, events }
    }

    async fn next(&mut self) -> Option<LogEntry> {
        let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for a net event")
            .expect("event queue closed");
        self.lifecycle.handle_event(event)
    }

    async fn next_chat(&mut self) -> (String, ChatBody, Origin) {
        match self.next().await {
            Some(LogEntry::Chat {
                sender,
                body,
                origin,
            }) => (sender, body, origin),
            other => panic!("expected chat entry, got {other:?}"),
        }
    }

    async fn assert_quiet(&mut self) {
        let result = tokio::time::timeout(Duration::from_millis(200), self.events.recv()).await;
        assert!(result.is_err(), "unexpected event: {result:?}");
    }
}

async fn start_relay(state: RelayState) -> (String, Arc<RelayState>) {
    let state = Arc::new(state);
    let (addr, _handle) = relay::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("failed to start relay server");
    (format!("ws://{addr}/ws"), state)
}

/// Connect clients one by one, waiting until the relay has registered each.
async fn join(url: &str, state: &RelayState, who: &[(&str, &str)]) -> Vec<Client> {
    let mut clients = Vec::new();
    for (name, secret) in who {
        let mut client = Client::start(url, name, secret);
        assert_eq!(
            client.next().await,
            Some(LogEntry::System(NOTICE_CONNECTED.to_string()))
        );
        clients.push(client);
        for _ in 0..200 {
            if state.connection_count().await >= clients.len() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.connection_count().await, clients.len());
    }
    clients
}

#[tokio::test]
async fn message_reaches_peer_and_echoes_to_sender() {
    let (url, state) = start_relay(RelayState::new()).await;
    let mut clients = join(&url, &state, &[("ana", "clave123"), ("beto", "clave123")]).await;

    assert_eq!(clients[0].lifecycle.send("hola"), SendOutcome::Sent);

    let (sender, body, origin) = clients[1].next_chat().await;
    assert_eq!(sender, "ana");
    assert_eq!(body, ChatBody::Text("hola".to_string()));
    assert_eq!(origin, Origin::Peer);

    let (sender, body, origin) = clients[0].next_chat().await;
    assert_eq!(sender, "ana");
    assert_eq!(body, ChatBody::Text("hola".to_string()));
    assert_eq!(origin, Origin::Own);
}

#[tokio::test]
async fn wrong_secret_sees_placeholder() {
    let (url, state) = start_relay(RelayState::new()).await;
    let mut clients = join(
        &url,
        &state,
        &[("ana", "clave123"), ("beto", "clave123"), ("eve", "clave124")],
    )
    .await;

    assert_eq!(clients[0].lifecycle.send("secreto"), SendOutcome::Sent);

    let (_, body, _) = clients[1].next_chat().await;
    assert_eq!(body.display(), "secreto");

    let (sender, body, _) = clients[2].next_chat().await;
    assert_eq!(sender, "ana");
    assert!(matches!(body, ChatBody::Undecryptable(_)));
    assert_eq!(body.display(), UNDECRYPTABLE_PLACEHOLDER);
}

#[tokio::test]
async fn no_echo_relay_skips_sender() {
    let (url, state) = start_relay(RelayState::with_config(DEFAULT_MAX_FRAME_SIZE, false)).await;
    let mut clients = join(&url, &state, &[("ana", "clave123"), ("beto", "clave123")]).await;

    assert_eq!(clients[0].lifecycle.send("hola"), SendOutcome::Sent);

    let (sender, _, _) = clients[1].next_chat().await;
    assert_eq!(sender, "ana");
    clients[0].assert_quiet().await;
}

#[tokio::test]
async fn relay_shutdown_closes_clients() {
    let (url, state) = start_relay(RelayState::new()).await;
    let mut clients = join(&url, &state, &[("ana", "clave123")]).await;

    state.close_all_connections().await;

    match clients[0].next().await {
        Some(LogEntry::System(text)) => assert!(text.starts_with("Disconnected"), "{text}"),
        other => panic!("expected disconnect notice, got {other:?}"),
    }
    assert_eq!(clients[0].lifecycle.state(), ConnectionState::Closed);
    assert!(!clients[0].lifecycle.input_enabled());
}

#[tokio::test]
async fn unreachable_server_ends_in_closed() {
    // Reserve a port, then free it so nothing is listening there.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut client = Client::start(&format!("ws://{addr}/ws"), "ana", "clave123");
    match client.next().await {
        Some(LogEntry::System(text)) => assert!(text.starts_with("Disconnected ("), "{text}"),
        other => panic!("expected disconnect notice, got {other:?}"),
    }
    assert_eq!(client.lifecycle.state(), ConnectionState::Closed);
}
