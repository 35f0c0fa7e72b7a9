//! WebSocket channel to the relay.
//!
//! Implements [`Channel`] over a `tokio-tungstenite` connection. The relay
//! forwards frames verbatim, so this layer only moves text frames; it never
//! looks inside them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::{Channel, ChannelError};

/// Type alias for the write half of a WebSocket connection.
type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Capacity of the buffer between the reader task and [`Channel::recv`].
const INCOMING_BUFFER: usize = 256;

/// WebSocket channel implementing the [`Channel`] trait.
///
/// Created via [`WsChannel::connect`], which opens the connection and
/// spawns a background reader task.
pub struct WsChannel {
    /// Server URL (ws:// or wss://).
    url: String,
    /// Write half of the connection.
    ws_sender: Mutex<WsSender>,
    /// Text frames pushed by the reader task.
    incoming: Mutex<mpsc::Receiver<String>>,
    /// Whether the connection is still up.
    connected: Arc<AtomicBool>,
    /// Background reader task, aborted on drop.
    reader_handle: tokio::task::JoinHandle<()>,
}

impl WsChannel {
    /// Open a WebSocket connection to `url`.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::Timeout`] if the handshake does not finish in `timeout`.
    /// - [`ChannelError::Unreachable`] if the server refuses the connection.
    /// - [`ChannelError::Io`] for TLS, HTTP or other handshake failures.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, ChannelError> {
        let (ws_stream, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| {
                tracing::warn!(url, "WebSocket connect timed out");
                ChannelError::Timeout
            })?
            .map_err(|e| {
                tracing::warn!(url, err = %e, "WebSocket connect failed");
                map_ws_connect_error(url, e)
            })?;

        let (ws_sender, ws_reader) = ws_stream.split();

        let (tx, rx) = mpsc::channel(INCOMING_BUFFER);
        let connected = Arc::new(AtomicBool::new(true));
        let reader_handle = tokio::spawn(reader_loop(ws_reader, tx, Arc::clone(&connected)));

        tracing::info!(url, "WebSocket channel open");

        Ok(Self {
            url: url.to_string(),
            ws_sender: Mutex::new(ws_sender),
            incoming: Mutex::new(rx),
            connected,
            reader_handle,
        })
    }

    /// Return the URL this channel is connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

impl Channel for WsChannel {
    async fn send(&self, frame: &str) -> Result<(), ChannelError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(ChannelError::Closed);
        }

        let mut sender = self.ws_sender.lock().await;
        sender.send(Message::text(frame.to_string())).await.map_err(|e| {
            tracing::warn!(err = %e, "WebSocket send failed");
            self.connected.store(false, Ordering::Relaxed);
            ChannelError::Closed
        })
    }

    async fn recv(&self) -> Result<String, ChannelError> {
        let mut rx = self.incoming.lock().await;
        rx.recv().await.ok_or(ChannelError::Closed)
    }

    async fn close(&self) {
        let was_open = self.connected.swap(false, Ordering::Relaxed);
        if was_open {
            let mut sender = self.ws_sender.lock().await;
            if let Err(e) = sender.close().await {
                tracing::debug!(err = %e, "WebSocket close handshake failed");
            }
            tracing::info!(url = %self.url, "WebSocket channel closed locally");
        }
    }

    fn is_open(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Background task that reads WebSocket frames and forwards text payloads.
///
/// Binary frames carrying valid UTF-8 are forwarded as text; other binary
/// frames are skipped. Sets `connected` to `false` when the socket closes
/// or errors out.
async fn reader_loop(mut ws_reader: WsReader, tx: mpsc::Sender<String>, connected: Arc<AtomicBool>) {
    while let Some(msg_result) = ws_reader.next().await {
        let text = match msg_result {
            Ok(Message::Text(text)) => text.as_str().to_string(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    tracing::debug!(len = data.len(), "skipping non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket closed by server");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
            Err(e) => {
                tracing::warn!(err = %e, "WebSocket read error");
                break;
            }
        };
        if tx.send(text).await.is_err() {
            // Channel dropped; nobody is listening.
            break;
        }
    }
    connected.store(false, Ordering::Relaxed);
    tracing::debug!("WebSocket reader task exiting");
}

/// Map a `tokio_tungstenite` connection error to a [`ChannelError`].
fn map_ws_connect_error(url: &str, err: tokio_tungstenite::tungstenite::Error) -> ChannelError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::ConnectionRefused
                || io_err.kind() == std::io::ErrorKind::AddrNotAvailable
            {
                ChannelError::Unreachable(url.to_string())
            } else {
                ChannelError::Io(io_err)
            }
        }
        WsError::Http(response) => ChannelError::Io(std::io::Error::other(format!(
            "server HTTP error: status {}",
            response.status()
        ))),
        other => ChannelError::Io(std::io::Error::other(format!(
            "WebSocket connection error: {other}"
        ))),
    }
}
