//! Integration tests for the connection lifecycle over loopback channels.
//!
//! Two lifecycles are wired together through a `LoopbackChannel` pair and
//! the real connection task (`spawn_with_channel`). Verifies:
//! - opening enables input and emits the connected notice
//! - a sent message is decoded by a peer holding the same secret
//! - a peer holding a different secret sees the placeholder
//! - sends before open or with blank text transmit nothing
//! - a remote close moves the other side to `Closed`
//! - exit clears the session and returns to `Disconnected`

use std::time::Duration;

use saltchat::crypto::DecodeError;
use saltchat::lifecycle::{
    ChatBody, ConnectionState, Lifecycle, LogEntry, NOTICE_CONNECTED, NOTICE_NOT_CONNECTED,
    Origin, SendOutcome, UNDECRYPTABLE_PLACEHOLDER,
};
use saltchat::net::{self, NetCommand, NetEvent};
use saltchat::transport::loopback::LoopbackChannel;
use tokio::sync::mpsc;

struct Client {
    lifecycle: Lifecycle,
    events: mpsc::Receiver<NetEvent>,
}

impl Client {
    /// Start a session and attach it to one end of a loopback pair.
    fn start(name: &str, secret: &str, channel: LoopbackChannel) -> Self {
        let mut lifecycle = Lifecycle::new();
        lifecycle.start(name, secret).expect("valid credentials");
        let (cmd_tx, events) = net::spawn_with_channel(channel, 16);
        lifecycle.attach(cmd_tx);
        Self { lifecycle, events }
    }

    /// Wait for the next event and apply it.
    async fn next(&mut self) -> Option<LogEntry> {
        let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for a net event")
            .expect("event queue closed");
        self.lifecycle.handle_event(event)
    }

    /// Assert that no event arrives for a short while.
    async fn assert_quiet(&mut self) {
        let result = tokio::time::timeout(Duration::from_millis(150), self.events.recv()).await;
        assert!(result.is_err(), "unexpected event: {result:?}");
    }
}

async fn connected_pair(secret_a: &str, secret_b: &str) -> (Client, Client) {
    let (a, b) = LoopbackChannel::create_pair(16);
    let mut ana = Client::start("ana", secret_a, a);
    let mut beto = Client::start("beto", secret_b, b);
    assert_eq!(
        ana.next().await,
        Some(LogEntry::System(NOTICE_CONNECTED.to_string()))
    );
    assert_eq!(
        beto.next().await,
        Some(LogEntry::System(NOTICE_CONNECTED.to_string()))
    );
    (ana, beto)
}

#[tokio::test]
async fn open_enables_input() {
    let (ana, beto) = connected_pair("clave123", "clave123").await;
    assert_eq!(ana.lifecycle.state(), ConnectionState::Open);
    assert!(ana.lifecycle.input_enabled());
    assert!(beto.lifecycle.input_enabled());
}

#[tokio::test]
async fn shared_secret_message_is_decoded() {
    let (mut ana, mut beto) = connected_pair("clave123", "clave123").await;

    assert_eq!(ana.lifecycle.send("  hola  "), SendOutcome::Sent);

    assert_eq!(
        beto.next().await,
        Some(LogEntry::Chat {
            sender: "ana".to_string(),
            body: ChatBody::Text("hola".to_string()),
            origin: Origin::Peer,
        })
    );
}

#[tokio::test]
async fn conversation_flows_both_ways_in_order() {
    let (mut ana, mut beto) = connected_pair("clave123", "clave123").await;

    for text in ["uno", "dos", "tres"] {
        assert_eq!(ana.lifecycle.send(text), SendOutcome::Sent);
    }
    assert_eq!(beto.lifecycle.send("¡hola!"), SendOutcome::Sent);

    for expected in ["uno", "dos", "tres"] {
        match beto.next().await {
            Some(LogEntry::Chat { body, .. }) => assert_eq!(body.display(), expected),
            other => panic!("expected chat entry, got {other:?}"),
        }
    }
    match ana.next().await {
        Some(LogEntry::Chat { sender, body, .. }) => {
            assert_eq!(sender, "beto");
            assert_eq!(body, ChatBody::Text("¡hola!".to_string()));
        }
        other => panic!("expected chat entry, got {other:?}"),
    }
}

#[tokio::test]
async fn different_secret_renders_placeholder() {
    let (mut ana, mut beto) = connected_pair("clave123", "clave124").await;

    assert_eq!(ana.lifecycle.send("hola"), SendOutcome::Sent);

    match beto.next().await {
        Some(LogEntry::Chat { sender, body, origin }) => {
            assert_eq!(sender, "ana");
            assert_eq!(origin, Origin::Peer);
            assert!(matches!(
                body,
                ChatBody::Undecryptable(DecodeError::SaltMismatch | DecodeError::HashMismatch)
            ));
            assert_eq!(body.display(), UNDECRYPTABLE_PLACEHOLDER);
        }
        other => panic!("expected chat entry, got {other:?}"),
    }
}

#[tokio::test]
async fn non_chat_frames_are_ignored() {
    let (a, b) = LoopbackChannel::create_pair(16);
    let mut beto = Client::start("beto", "clave123", b);
    beto.next().await;

    // Drive the other end by hand to inject arbitrary frames.
    let (raw_tx, _raw_events) = net::spawn_with_channel(a, 16);
    for frame in [
        "not json",
        r#"{"tipo":"ping"}"#,
        r#"{"nombre":"","cifrado":"AAAA","metadatos":{"salt":"s","hash":"h"}}"#,
        r#"{"nombre":"ana","cifrado":"AAAA"}"#,
    ] {
        raw_tx
            .send(NetCommand::Transmit(frame.to_string()))
            .await
            .unwrap();
    }

    for _ in 0..4 {
        assert_eq!(beto.next().await, None);
    }
    beto.assert_quiet().await;
}

#[tokio::test]
async fn send_before_open_transmits_nothing() {
    let (a, b) = LoopbackChannel::create_pair(16);
    let mut lifecycle = Lifecycle::new();
    lifecycle.start("ana", "clave123").unwrap();
    let (cmd_tx, _events) = net::spawn_with_channel(a, 16);
    lifecycle.attach(cmd_tx);

    // The Opened event has not been applied yet.
    assert_eq!(lifecycle.state(), ConnectionState::Connecting);
    assert_eq!(
        lifecycle.send("hola"),
        SendOutcome::Rejected(LogEntry::System(NOTICE_NOT_CONNECTED.to_string()))
    );

    let mut beto = Client::start("beto", "clave123", b);
    beto.next().await;
    beto.assert_quiet().await;
}

#[tokio::test]
async fn blank_sends_are_ignored() {
    let (mut ana, mut beto) = connected_pair("clave123", "clave123").await;
    assert_eq!(ana.lifecycle.send(""), SendOutcome::Ignored);
    assert_eq!(ana.lifecycle.send(" \t\n "), SendOutcome::Ignored);
    beto.assert_quiet().await;
}

#[tokio::test]
async fn remote_exit_closes_the_other_side() {
    let (mut ana, mut beto) = connected_pair("clave123", "clave123").await;

    beto.lifecycle.exit();
    assert_eq!(beto.lifecycle.state(), ConnectionState::Disconnected);
    assert!(beto.lifecycle.session().is_none());

    match ana.next().await {
        Some(LogEntry::System(text)) => assert!(text.starts_with("Disconnected"), "{text}"),
        other => panic!("expected disconnect notice, got {other:?}"),
    }
    assert_eq!(ana.lifecycle.state(), ConnectionState::Closed);
    assert!(!ana.lifecycle.input_enabled());
    assert_eq!(
        ana.lifecycle.send("anyone?"),
        SendOutcome::Rejected(LogEntry::System(NOTICE_NOT_CONNECTED.to_string()))
    );
}

#[tokio::test]
async fn closed_session_restarts_only_after_exit() {
    let (mut ana, mut beto) = connected_pair("clave123", "clave123").await;
    beto.lifecycle.exit();
    ana.next().await;
    assert_eq!(ana.lifecycle.state(), ConnectionState::Closed);

    assert!(ana.lifecycle.start("ana", "clave123").is_err());
    ana.lifecycle.exit();
    assert!(ana.lifecycle.start("ana", "clave123").is_ok());
    assert_eq!(ana.lifecycle.state(), ConnectionState::Connecting);
}
