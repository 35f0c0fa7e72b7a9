//! Relay server core: shared state, WebSocket handler, connection registry,
//! and broadcast.
//!
//! Every accepted socket gets a numeric connection id. Frames received on
//! any socket are forwarded unchanged to all registered connections,
//! including the sender unless echo is disabled.
//!
//! Memory per connection is bounded twice over. The WebSocket layer refuses
//! messages above [`RelayState::transport_limit`] and closes the socket, and
//! each client has a fixed-length outbound queue. A client that stops
//! reading loses frames instead of growing the relay.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{RwLock, mpsc};

/// Default maximum accepted frame size in bytes (64 KB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Default number of frames queued per client.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Frames up to this multiple of `max_frame_size` are read and dropped;
/// anything larger is refused by the WebSocket layer.
const OVERSIZE_GRACE: usize = 4;

/// Shared relay server state holding the connection registry.
pub struct RelayState {
    /// Maps connection id to a channel sender feeding that socket's writer.
    connections: RwLock<HashMap<u64, mpsc::Sender<Message>>>,
    /// Source of connection ids.
    next_id: AtomicU64,
    /// Frames larger than this are dropped.
    max_frame_size: usize,
    /// Capacity of each connection's outbound queue.
    outbound_queue: usize,
    /// Whether a frame is also delivered back to its sender.
    echo_to_sender: bool,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayState {
    /// Creates a relay state with the default frame size limit and echo on.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_FRAME_SIZE, true)
    }

    /// Creates a relay state with a custom frame size limit and echo policy.
    #[must_use]
    pub fn with_config(max_frame_size: usize, echo_to_sender: bool) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            max_frame_size,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            echo_to_sender,
        }
    }

    /// Sets the per-connection outbound queue length (at least 1).
    #[must_use]
    pub fn with_outbound_queue(mut self, outbound_queue: usize) -> Self {
        self.outbound_queue = outbound_queue.max(1);
        self
    }

    /// Capacity of each connection's outbound queue.
    #[must_use]
    pub const fn outbound_queue(&self) -> usize {
        self.outbound_queue
    }

    /// Largest message the WebSocket layer will read before closing the
    /// socket.
    #[must_use]
    pub const fn transport_limit(&self) -> usize {
        self.max_frame_size.saturating_mul(OVERSIZE_GRACE)
    }

    /// Registers a connection and returns its freshly assigned id.
    pub async fn register(&self, sender: mpsc::Sender<Message>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.write().await.insert(id, sender);
        id
    }

    /// Removes a connection from the registry, returning the sender if it existed.
    pub async fn unregister(&self, id: u64) -> Option<mpsc::Sender<Message>> {
        self.connections.write().await.remove(&id)
    }

    /// Number of currently registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Forwards `msg` to every registered connection, skipping `from` when
    /// echo is disabled. Returns how many connections it was queued for.
    ///
    /// Never waits: a connection whose queue is full misses this frame.
    /// Connections whose writer has gone away are unregistered.
    pub async fn broadcast(&self, from: u64, msg: &Message) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let conns = self.connections.read().await;
            for (id, sender) in conns.iter() {
                if *id == from && !self.echo_to_sender {
                    continue;
                }
                match sender.try_send(msg.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(conn_id = id, "outbound queue full, frame dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => dead.push(*id),
                }
            }
        }
        for id in dead {
            tracing::warn!(conn_id = id, "forward failed, unregistering connection");
            self.unregister(id).await;
        }
        delivered
    }

    /// Send a WebSocket Close frame to all connected clients.
    ///
    /// Each writer task forwards the close frame, which lets client readers
    /// observe the disconnect. Used for graceful shutdown and tests.
    pub async fn close_all_connections(&self) {
        let conns = self.connections.read().await;
        for (id, sender) in conns.iter() {
            tracing::info!(conn_id = id, "sending close frame to client");
            let _ = sender.try_send(Message::Close(None));
        }
    }
}

/// Handles an upgraded WebSocket connection for a single client.
///
/// The connection lifecycle:
/// 1. Register the connection and obtain its id.
/// 2. Spawn a writer forwarding queued messages to the socket.
/// 3. Read frames and broadcast each one.
/// 4. On disconnect, unregister.
pub async fn handle_socket(socket: WebSocket, state: Arc<RelayState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<Message>(state.outbound_queue);
    let conn_id = state.register(tx).await;
    tracing::info!(conn_id, "client connected");

    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(conn_id, "WebSocket write failed");
                break;
            }
        }
    });

    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            let msg = match result {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(conn_id, error = %e, "WebSocket read failed, closing");
                    break;
                }
            };
            match msg {
                Message::Text(_) | Message::Binary(_) => {
                    handle_frame(conn_id, msg, &reader_state).await;
                }
                Message::Close(_) => {
                    tracing::info!(conn_id, "received close frame");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    state.unregister(conn_id).await;
    tracing::info!(conn_id, "client disconnected and unregistered");
}

/// Applies the size limit to one data frame and broadcasts it.
async fn handle_frame(conn_id: u64, msg: Message, state: &RelayState) {
    let size = frame_len(&msg);
    if size > state.max_frame_size {
        tracing::warn!(
            conn_id,
            size,
            max = state.max_frame_size,
            "frame exceeds size limit, dropped"
        );
        return;
    }

    let delivered = state.broadcast(conn_id, &msg).await;
    tracing::debug!(conn_id, size, delivered, "frame broadcast");
}

fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(text) => text.len(),
        Message::Binary(data) => data.len(),
        _ => 0,
    }
}

/// Starts the relay server on the given address with default settings and
/// returns the bound address and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(RelayState::new())).await
}

/// Starts the relay server with a pre-configured [`RelayState`].
///
/// Use [`RelayState::with_config`] to apply the resolved
/// [`crate::config::RelayConfig`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<RelayState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "relay server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<RelayState>>,
) -> impl axum::response::IntoResponse {
    let limit = state.transport_limit();
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| handle_socket(socket, state))
}
