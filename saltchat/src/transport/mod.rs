//! Message channel abstraction for `SaltChat`.
//!
//! Defines the [`Channel`] trait: one bidirectional text-frame channel per
//! session. Concrete implementations:
//! - [`ws::WsChannel`]: WebSocket connection to the relay
//! - [`loopback::LoopbackChannel`]: in-process channel pair for testing

pub mod loopback;
pub mod ws;

/// Errors that can occur on a channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The channel has been closed by either side.
    #[error("connection closed")]
    Closed,

    /// Connecting took longer than the configured timeout.
    #[error("connection timed out")]
    Timeout,

    /// The server could not be reached.
    #[error("server {0} is unreachable")]
    Unreachable(String),

    /// An underlying I/O or protocol error occurred.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Async channel carrying JSON text frames.
///
/// The channel never interprets frames. Envelopes are built and parsed by
/// the lifecycle; the channel only moves strings.
pub trait Channel: Send + Sync {
    /// Send one text frame.
    ///
    /// Returns once the frame is handed to the underlying connection. There
    /// is no delivery acknowledgment.
    fn send(&self, frame: &str) -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;

    /// Receive the next text frame.
    ///
    /// Returns [`ChannelError::Closed`] once the remote side has gone away.
    fn recv(&self) -> impl std::future::Future<Output = Result<String, ChannelError>> + Send;

    /// Close the channel. Closing twice is a no-op.
    fn close(&self) -> impl std::future::Future<Output = ()> + Send;

    /// Whether the channel is still open.
    fn is_open(&self) -> bool;
}
