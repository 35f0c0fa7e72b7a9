//! Loopback channel for testing.
//!
//! Uses in-process [`tokio::sync::mpsc`] channels to simulate a connection.
//! Created via [`LoopbackChannel::create_pair`], which returns two connected
//! endpoints: sending on one delivers to the other.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};

use super::{Channel, ChannelError};

/// In-process channel backed by `tokio::sync::mpsc`.
pub struct LoopbackChannel {
    /// Sender toward the remote endpoint. `None` once closed locally.
    tx: Mutex<Option<mpsc::Sender<String>>>,
    /// Frames sent by the remote endpoint.
    rx: Mutex<mpsc::Receiver<String>>,
    open: AtomicBool,
}

impl LoopbackChannel {
    /// Create a pair of connected loopback channels.
    ///
    /// `buffer` is the capacity of each direction.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use saltchat::transport::Channel;
    /// use saltchat::transport::loopback::LoopbackChannel;
    ///
    /// # async fn example() {
    /// let (a, b) = LoopbackChannel::create_pair(8);
    /// a.send("hello").await.unwrap();
    /// assert_eq!(b.recv().await.unwrap(), "hello");
    /// # }
    /// ```
    #[must_use]
    pub fn create_pair(buffer: usize) -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::channel(buffer);
        let (tx_b, rx_b) = mpsc::channel(buffer);

        let a = Self {
            tx: Mutex::new(Some(tx_b)),
            rx: Mutex::new(rx_a),
            open: AtomicBool::new(true),
        };
        let b = Self {
            tx: Mutex::new(Some(tx_a)),
            rx: Mutex::new(rx_b),
            open: AtomicBool::new(true),
        };
        (a, b)
    }
}

impl Channel for LoopbackChannel {
    async fn send(&self, frame: &str) -> Result<(), ChannelError> {
        let tx = self.tx.lock().await;
        let Some(tx) = tx.as_ref() else {
            return Err(ChannelError::Closed);
        };
        tx.send(frame.to_string()).await.map_err(|_| {
            self.open.store(false, Ordering::Relaxed);
            ChannelError::Closed
        })
    }

    async fn recv(&self) -> Result<String, ChannelError> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(frame) => Ok(frame),
            None => {
                self.open.store(false, Ordering::Relaxed);
                Err(ChannelError::Closed)
            }
        }
    }

    async fn close(&self) {
        self.tx.lock().await.take();
        self.open.store(false, Ordering::Relaxed);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }
}
