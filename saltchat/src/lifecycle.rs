//! Connection lifecycle: the state machine behind the chat screen.
//!
//! ```text
//! Disconnected ──start──► Connecting ──opened──► Open ──closed──► Closed
//!      ▲                       │                                   │
//!      └────────────── exit ◄──┴───────────────────────────────────┘
//! ```
//!
//! The lifecycle owns the [`Session`] and the command queue of the one
//! connection task. It turns user actions and [`NetEvent`]s into log entries
//! for the UI and envelopes for the wire. It never blocks: sends go through
//! `try_send` and nothing is queued while the channel is not open.

use saltchat_proto::envelope::{Envelope, Frame, UnknownReason};
use tokio::sync::mpsc;

use crate::crypto::pipeline::SaltedXor;
use crate::crypto::{DecodeError, MessageCipher, ValidationError};
use crate::net::{NetCommand, NetEvent};
use crate::session::Session;

/// Text shown in place of a message that could not be decoded.
pub const UNDECRYPTABLE_PLACEHOLDER: &str = "[message encrypted: wrong key]";

/// Notice shown when the channel opens.
pub const NOTICE_CONNECTED: &str = "Connected to the chat.";

/// Notice shown when a send is attempted without an open channel.
pub const NOTICE_NOT_CONNECTED: &str = "Not connected. Wait for the chat to be ready.";

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session; the login form is shown.
    Disconnected,
    /// Session started, waiting for the channel to open.
    Connecting,
    /// Channel open; input enabled.
    Open,
    /// Channel gone; the user must exit back to login.
    Closed,
}

impl ConnectionState {
    /// Short label for the status bar.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Open => "Connected",
            Self::Closed => "Closed",
        }
    }
}

/// Whether a chat line came from the local user or someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Sender name equals the local display name.
    Own,
    /// Any other sender.
    Peer,
}

/// Body of a rendered chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatBody {
    /// Successfully decoded plaintext.
    Text(String),
    /// Decode failed; the kind is kept for diagnostics.
    Undecryptable(DecodeError),
}

impl ChatBody {
    /// Text to display for this body.
    #[must_use]
    pub fn display(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Undecryptable(_) => UNDECRYPTABLE_PLACEHOLDER,
        }
    }
}

/// One line produced by the lifecycle for the message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// Local notice (connection changes, rejected sends).
    System(String),
    /// A chat message received from the channel.
    Chat {
        /// Sender display name from the envelope.
        sender: String,
        /// Decoded text or placeholder.
        body: ChatBody,
        /// Own or peer message.
        origin: Origin,
    },
}

impl LogEntry {
    fn system(text: impl Into<String>) -> Self {
        Self::System(text.into())
    }
}

/// Result of [`Lifecycle::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Envelope handed to the connection task; the input can be cleared.
    Sent,
    /// Empty or whitespace-only text; nothing happened.
    Ignored,
    /// Not sent; show the notice and keep the input.
    Rejected(LogEntry),
}

/// The connection state machine.
pub struct Lifecycle<C = SaltedXor> {
    state: ConnectionState,
    session: Option<Session<C>>,
    link: Option<mpsc::Sender<NetCommand>>,
}

impl<C> Default for Lifecycle<C> {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            session: None,
            link: None,
        }
    }
}

impl Lifecycle<SaltedXor> {
    /// Create a lifecycle in [`ConnectionState::Disconnected`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate credentials and start a session.
    ///
    /// On success the state is [`ConnectionState::Connecting`]; the caller
    /// opens the channel and hands its command sender to [`Self::attach`].
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MissingCredentials`] if name or secret is empty.
    /// - [`ValidationError::AlreadyStarted`] if not in `Disconnected`.
    ///
    /// Neither error changes state.
    pub fn start(
        &mut self,
        display_name: &str,
        secret: &str,
    ) -> Result<&Session<SaltedXor>, ValidationError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ValidationError::AlreadyStarted);
        }
        let session = Session::new(display_name, secret)?;
        self.start_session(session)
    }
}

impl<C: MessageCipher> Lifecycle<C> {
    /// Start with a pre-built session.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::AlreadyStarted`] if not in `Disconnected`.
    pub fn start_session(&mut self, session: Session<C>) -> Result<&Session<C>, ValidationError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ValidationError::AlreadyStarted);
        }
        tracing::info!(name = %session.display_name(), "session started");
        self.state = ConnectionState::Connecting;
        Ok(&*self.session.insert(session))
    }

    /// Attach the command queue of the connection task opened for this
    /// session.
    pub fn attach(&mut self, link: mpsc::Sender<NetCommand>) {
        self.link = Some(link);
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Active session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&Session<C>> {
        self.session.as_ref()
    }

    /// Whether the message input should accept submissions.
    #[must_use]
    pub fn input_enabled(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Apply one event from the connection task.
    pub fn handle_event(&mut self, event: NetEvent) -> Option<LogEntry> {
        match event {
            NetEvent::Opened => self.on_open(),
            NetEvent::Frame(text) => self.on_frame(&text),
            NetEvent::Closed { reason } => self.on_close(reason.as_deref()),
        }
    }

    /// The channel opened: `Connecting → Open`.
    pub fn on_open(&mut self) -> Option<LogEntry> {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = ?self.state, "ignoring open outside Connecting");
            return None;
        }
        self.state = ConnectionState::Open;
        tracing::info!("channel open");
        Some(LogEntry::system(NOTICE_CONNECTED))
    }

    /// An inbound frame arrived.
    ///
    /// Non-chat frames are dropped silently. Chat frames always render,
    /// either as plaintext or as the placeholder.
    #[must_use]
    pub fn on_frame(&self, text: &str) -> Option<LogEntry> {
        if self.state != ConnectionState::Open {
            return None;
        }
        let session = self.session.as_ref()?;

        let envelope = match Frame::parse(text) {
            Frame::Chat(envelope) => envelope,
            Frame::Unknown(reason) => {
                log_unknown(&reason);
                return None;
            }
        };

        let body = match session
            .cipher()
            .decode(&envelope.ciphertext, &envelope.metadata)
        {
            Ok(plaintext) => ChatBody::Text(plaintext),
            Err(kind) => {
                tracing::debug!(sender = %envelope.sender_name, error = %kind, "message decode failed");
                ChatBody::Undecryptable(kind)
            }
        };
        let origin = if envelope.sender_name == session.display_name() {
            Origin::Own
        } else {
            Origin::Peer
        };

        Some(LogEntry::Chat {
            sender: envelope.sender_name,
            body,
            origin,
        })
    }

    /// Encode and transmit a message.
    ///
    /// Whitespace-only text is ignored. Outside `Open` the send is rejected
    /// with a notice; nothing is buffered.
    pub fn send(&mut self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }
        let (ConnectionState::Open, Some(session), Some(link)) =
            (self.state, self.session.as_ref(), self.link.as_ref())
        else {
            return SendOutcome::Rejected(LogEntry::system(NOTICE_NOT_CONNECTED));
        };

        let sealed = match session.cipher().encode(text) {
            Ok(sealed) => sealed,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode message");
                return SendOutcome::Rejected(LogEntry::system(format!("Message not sent: {e}")));
            }
        };
        let envelope = Envelope {
            sender_name: session.display_name().to_string(),
            ciphertext: sealed.ciphertext,
            metadata: sealed.metadata,
        };
        let frame = match envelope.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize envelope");
                return SendOutcome::Rejected(LogEntry::system(format!("Message not sent: {e}")));
            }
        };

        match link.try_send(NetCommand::Transmit(frame)) {
            Ok(()) => SendOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => {
                SendOutcome::Rejected(LogEntry::system("Network busy, message not sent."))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                SendOutcome::Rejected(LogEntry::system(NOTICE_NOT_CONNECTED))
            }
        }
    }

    /// The channel closed remotely or failed: `Connecting | Open → Closed`.
    pub fn on_close(&mut self, reason: Option<&str>) -> Option<LogEntry> {
        if !matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            return None;
        }
        self.state = ConnectionState::Closed;
        self.link = None;
        tracing::info!(reason = reason.unwrap_or("none"), "channel closed");
        Some(LogEntry::system(reason.map_or_else(
            || "Disconnected.".to_string(),
            |r| format!("Disconnected ({r})."),
        )))
    }

    /// Leave the chat: close the channel if still open, drop the session,
    /// and return to `Disconnected`.
    pub fn exit(&mut self) {
        if let Some(link) = self.link.take() {
            // A full queue means the task is alive; dropping the sender
            // still ends it once the queue drains.
            let _ = link.try_send(NetCommand::Shutdown);
        }
        self.session = None;
        self.state = ConnectionState::Disconnected;
        tracing::info!("session ended");
    }
}

fn log_unknown(reason: &UnknownReason) {
    match reason {
        UnknownReason::Schema(detail) => {
            tracing::debug!(detail = %detail, "ignoring non-chat frame");
        }
        UnknownReason::EmptyField(field) => {
            tracing::debug!(field, "ignoring frame with empty field");
        }
    }
}
