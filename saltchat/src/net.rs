//! Networking coordinator between the UI loop and the channel.
//!
//! The UI loop is synchronous (crossterm polling) and never awaits network
//! I/O. This module spawns one tokio task per connection that owns the
//! [`Channel`] and talks to the UI through two bounded queues:
//!
//! ```text
//! UI loop  ←── NetEvent ───  connection task  ←──►  relay
//!          ─── NetCommand →
//! ```
//!
//! The task emits [`NetEvent::Opened`] once the channel is up, forwards each
//! inbound text frame as [`NetEvent::Frame`], and finishes with exactly one
//! [`NetEvent::Closed`]. There is no reconnect loop.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::transport::Channel;
use crate::transport::ws::WsChannel;

/// Commands sent from the UI loop to the connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetCommand {
    /// Send one serialized envelope.
    Transmit(String),
    /// Close the channel and stop the task.
    Shutdown,
}

/// Events sent from the connection task to the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    /// The channel is open and ready for traffic.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The channel is gone. `reason` is set for failures, `None` for a
    /// clean close.
    Closed {
        /// Human-readable cause, if any.
        reason: Option<String>,
    },
}

/// Configuration for one connection.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// WebSocket URL of the relay (e.g. `ws://127.0.0.1:8000/ws`).
    pub server_url: String,
    /// How long to wait for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Capacity of the command and event queues.
    pub channel_capacity: usize,
}

/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default capacity for the command and event queues.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

impl NetConfig {
    /// Creates a `NetConfig` with default timeout and queue capacity.
    #[must_use]
    pub const fn new(server_url: String) -> Self {
        Self {
            server_url,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Spawn a connection task that dials the relay over WebSocket.
///
/// Returns immediately; the outcome of the handshake arrives later as
/// [`NetEvent::Opened`] or [`NetEvent::Closed`]. Must be called from within
/// a tokio runtime.
#[must_use]
pub fn spawn_net(config: NetConfig) -> (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>) {
    let capacity = config.channel_capacity.max(1);
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    let (evt_tx, evt_rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        match WsChannel::connect(&config.server_url, config.connect_timeout).await {
            Ok(channel) => drive(channel, cmd_rx, evt_tx).await,
            Err(e) => {
                tracing::warn!(url = %config.server_url, error = %e, "connection failed");
                let _ = evt_tx
                    .send(NetEvent::Closed {
                        reason: Some(e.to_string()),
                    })
                    .await;
            }
        }
    });

    (cmd_tx, evt_rx)
}

/// Spawn a connection task around an already-open channel.
///
/// Used with [`crate::transport::loopback::LoopbackChannel`] in tests and
/// anywhere the channel is established by other means.
#[must_use]
pub fn spawn_with_channel<C>(
    channel: C,
    capacity: usize,
) -> (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>)
where
    C: Channel + 'static,
{
    // tokio panics on a zero-capacity channel.
    let capacity = capacity.max(1);
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    let (evt_tx, evt_rx) = mpsc::channel(capacity);
    tokio::spawn(drive(channel, cmd_rx, evt_tx));
    (cmd_tx, evt_rx)
}

/// Run one connection to completion.
///
/// Multiplexes outbound commands and inbound frames until the channel
/// closes, a send fails, or [`NetCommand::Shutdown`] arrives (or the command
/// sender is dropped). Always ends by emitting [`NetEvent::Closed`].
pub async fn drive<C: Channel>(
    channel: C,
    mut cmd_rx: mpsc::Receiver<NetCommand>,
    evt_tx: mpsc::Sender<NetEvent>,
) {
    if evt_tx.send(NetEvent::Opened).await.is_err() {
        channel.close().await;
        return;
    }

    let reason = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(NetCommand::Transmit(frame)) => {
                    if let Err(e) = channel.send(&frame).await {
                        tracing::warn!(error = %e, "transmit failed");
                        break Some(e.to_string());
                    }
                }
                Some(NetCommand::Shutdown) | None => {
                    tracing::info!("connection task shutting down");
                    channel.close().await;
                    break None;
                }
            },
            incoming = channel.recv() => match incoming {
                Ok(frame) => {
                    if evt_tx.send(NetEvent::Frame(frame)).await.is_err() {
                        // UI dropped; nothing left to deliver to.
                        channel.close().await;
                        return;
                    }
                }
                Err(e) => {
                    tracing::info!(error = %e, "channel closed");
                    break Some(e.to_string());
                }
            },
        }
    };

    let _ = evt_tx.send(NetEvent::Closed { reason }).await;
}
