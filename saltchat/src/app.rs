//! Application state and event handling.
//!
//! Two screens share one [`App`]: the login form collects a display name and
//! the shared secret, the chat screen shows the message log and the input
//! line. All protocol decisions are delegated to the [`Lifecycle`]; this
//! module only routes keys and keeps what is on screen.

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;
use zeroize::{Zeroize, Zeroizing};

use crate::lifecycle::{ConnectionState, Lifecycle, LogEntry, SendOutcome};
use crate::net::{NetCommand, NetEvent};

/// Fallback when the configured timestamp format cannot be rendered.
const DEFAULT_TIMESTAMP_FORMAT: &str = "%H:%M";

/// Which screen is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Name and secret entry.
    Login,
    /// Message log and input line.
    Chat,
}

/// Focused field on the login screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginField {
    /// Display name.
    #[default]
    Name,
    /// Shared secret (masked).
    Secret,
}

/// Something the event loop has to do on behalf of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Credentials accepted; open a connection and [`App::attach`] it.
    Connect,
}

/// Login form contents.
#[derive(Default)]
pub struct LoginForm {
    /// Display name as typed.
    pub name: String,
    /// Secret as typed; wiped on submit and on drop.
    pub secret: Zeroizing<String>,
    /// Focused field.
    pub focus: LoginField,
    /// Validation message from the last submit.
    pub error: Option<String>,
}

impl LoginForm {
    fn clear(&mut self) {
        self.name.clear();
        self.secret.zeroize();
        self.focus = LoginField::Name;
        self.error = None;
    }

    const fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Name => LoginField::Secret,
            LoginField::Secret => LoginField::Name,
        };
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Name => &mut self.name,
            LoginField::Secret => &mut *self.secret,
        }
    }
}

/// A log entry with the local time it was shown.
#[derive(Debug, Clone)]
pub struct TimedEntry {
    /// Formatted local time.
    pub timestamp: String,
    /// What to show.
    pub entry: LogEntry,
}

/// Main application state.
pub struct App {
    /// Current screen.
    pub screen: Screen,
    /// Login form state.
    pub login: LoginForm,
    /// Message log of the current session.
    pub log: Vec<TimedEntry>,
    /// Current text input on the chat screen.
    pub input: String,
    /// Cursor position in input (character index).
    pub cursor_position: usize,
    /// Lines scrolled back from the bottom of the log.
    pub scroll_back: usize,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Connection state machine.
    pub lifecycle: Lifecycle,
    net_rx: Option<mpsc::Receiver<NetEvent>>,
    timestamp_format: String,
}

impl App {
    /// Create an app on the login screen.
    #[must_use]
    pub fn new() -> Self {
        Self {
            screen: Screen::Login,
            login: LoginForm::default(),
            log: Vec::new(),
            input: String::new(),
            cursor_position: 0,
            scroll_back: 0,
            should_quit: false,
            lifecycle: Lifecycle::new(),
            net_rx: None,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }

    /// Pre-fill the display name field.
    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        if let Some(name) = name {
            self.login.name = name;
            self.login.focus = LoginField::Secret;
        }
        self
    }

    /// Set the chrono format used for log timestamps.
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Connection state shown in the status bar.
    #[must_use]
    pub const fn connection_state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    /// Hand the connection task's queues to the app after [`Action::Connect`].
    pub fn attach(&mut self, cmd_tx: mpsc::Sender<NetCommand>, evt_rx: mpsc::Receiver<NetEvent>) {
        self.lifecycle.attach(cmd_tx);
        self.net_rx = Some(evt_rx);
    }

    /// Handle a key event.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<Action> {
        if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
            self.quit();
            return None;
        }

        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Chat => {
                self.handle_chat_key(key);
                None
            }
        }
    }

    /// Drain all pending [`NetEvent`]s and apply them.
    ///
    /// If the connection task went away without a `Closed` event, the
    /// lifecycle is closed here so the UI never waits forever.
    pub fn drain_net_events(&mut self) {
        let Some(mut rx) = self.net_rx.take() else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    if let Some(entry) = self.lifecycle.handle_event(event) {
                        self.push_entry(entry);
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => {
                    self.net_rx = Some(rx);
                    return;
                }
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if let Some(entry) = self.lifecycle.on_close(None) {
                        self.push_entry(entry);
                    }
                    return;
                }
            }
        }
    }

    /// Append an entry stamped with the current local time.
    pub fn push_entry(&mut self, entry: LogEntry) {
        let timestamp = format_timestamp(&Local::now(), &self.timestamp_format);
        self.log.push(TimedEntry { timestamp, entry });
        self.scroll_back = 0;
    }

    /// Leave the chat and return to a blank login form.
    pub fn exit_chat(&mut self) {
        self.lifecycle.exit();
        self.net_rx = None;
        self.log.clear();
        self.input.clear();
        self.cursor_position = 0;
        self.scroll_back = 0;
        self.login.clear();
        self.screen = Screen::Login;
    }

    fn quit(&mut self) {
        if self.screen == Screen::Chat {
            self.exit_chat();
        }
        self.should_quit = true;
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => self.quit(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.login.toggle_focus();
            }
            KeyCode::Enter => return self.submit_login(),
            KeyCode::Char(c) => self.login.focused_mut().push(c),
            KeyCode::Backspace => {
                self.login.focused_mut().pop();
            }
            _ => {}
        }
        None
    }

    fn submit_login(&mut self) -> Option<Action> {
        match self.lifecycle.start(&self.login.name, &self.login.secret) {
            Ok(session) => {
                let name = session.display_name().to_string();
                self.login.secret.zeroize();
                self.login.error = None;
                self.screen = Screen::Chat;
                self.push_entry(LogEntry::System(format!("Joining as {name}...")));
                Some(Action::Connect)
            }
            Err(e) => {
                tracing::debug!(error = %e, "login rejected");
                self.login.error = Some(capitalize(&e.to_string()));
                None
            }
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.exit_chat(),
            KeyCode::Enter => self.submit_message(),
            KeyCode::Char(c) => self.enter_char(c),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Home => self.cursor_position = 0,
            KeyCode::End => self.cursor_position = self.input.chars().count(),
            KeyCode::Up | KeyCode::PageUp => self.scroll_up(),
            KeyCode::Down | KeyCode::PageDown => self.scroll_down(),
            _ => {}
        }
    }

    fn submit_message(&mut self) {
        match self.lifecycle.send(&self.input) {
            SendOutcome::Sent => {
                self.input.clear();
                self.cursor_position = 0;
            }
            SendOutcome::Ignored => {}
            SendOutcome::Rejected(notice) => self.push_entry(notice),
        }
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_position)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn enter_char(&mut self, c: char) {
        let index = self.byte_index();
        self.input.insert(index, c);
        self.cursor_position += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let index = self.byte_index();
            self.input.remove(index);
        }
    }

    const fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input.chars().count() {
            self.cursor_position += 1;
        }
    }

    fn scroll_up(&mut self) {
        if self.scroll_back < self.log.len().saturating_sub(1) {
            self.scroll_back += 1;
        }
    }

    const fn scroll_down(&mut self) {
        self.scroll_back = self.scroll_back.saturating_sub(1);
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Format `now` with a chrono format string, falling back to `%H:%M` if the
/// format contains an invalid specifier.
#[must_use]
pub fn format_timestamp(now: &DateTime<Local>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", now.format(format)).is_err() {
        out.clear();
        let _ = write!(out, "{}", now.format(DEFAULT_TIMESTAMP_FORMAT));
    }
    out
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
