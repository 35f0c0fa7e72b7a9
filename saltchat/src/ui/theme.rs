//! Theme and styling constants for the TUI.

use ratatui::style::{Color, Modifier, Style};

use crate::lifecycle::ConnectionState;

/// Primary foreground color.
pub const FG_PRIMARY: Color = Color::White;

/// Secondary foreground color (dimmed text).
pub const FG_SECONDARY: Color = Color::Gray;

/// Highlight color for focused elements.
pub const HIGHLIGHT: Color = Color::Cyan;

/// Success/online indicator color.
pub const SUCCESS: Color = Color::Green;

/// Warning indicator color.
pub const WARNING: Color = Color::Yellow;

/// Error indicator color.
pub const ERROR: Color = Color::Red;

/// Offline indicator color.
pub const OFFLINE: Color = Color::DarkGray;

/// Color for the local user's own messages.
pub const OWN_SENDER: Color = Color::LightGreen;

/// Colors for peer sender names.
pub const SENDER_COLORS: [Color; 8] = [
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::LightCyan,
    Color::LightBlue,
    Color::Rgb(255, 165, 0),
    Color::Rgb(180, 120, 255),
];

/// Normal text style.
#[must_use]
pub fn normal() -> Style {
    Style::default().fg(FG_PRIMARY)
}

/// Dimmed text style (hints, placeholders).
#[must_use]
pub fn dimmed() -> Style {
    Style::default().fg(FG_SECONDARY)
}

/// Bold text style.
#[must_use]
pub fn bold() -> Style {
    Style::default().fg(FG_PRIMARY).add_modifier(Modifier::BOLD)
}

/// Highlighted text style (focused borders).
#[must_use]
pub fn highlighted() -> Style {
    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Style for validation errors.
#[must_use]
pub fn error() -> Style {
    Style::default().fg(ERROR).add_modifier(Modifier::BOLD)
}

/// Get a color for a peer based on their name.
#[must_use]
pub fn sender_color(name: &str) -> Color {
    let hash = name.bytes().fold(0u32, |acc, b| {
        acc.wrapping_mul(31).wrapping_add(u32::from(b))
    });
    SENDER_COLORS[(hash as usize) % SENDER_COLORS.len()]
}

/// Style for the local user's name.
#[must_use]
pub fn own_sender() -> Style {
    Style::default().fg(OWN_SENDER).add_modifier(Modifier::BOLD)
}

/// Style for system notices (italic, dim blue).
#[must_use]
pub fn system_message() -> Style {
    Style::default()
        .fg(Color::Rgb(100, 140, 180))
        .add_modifier(Modifier::ITALIC)
}

/// Style for the wrong-key placeholder.
#[must_use]
pub fn undecryptable() -> Style {
    Style::default()
        .fg(Color::Rgb(200, 90, 90))
        .add_modifier(Modifier::ITALIC)
}

/// Style for timestamps (dark gray).
#[must_use]
pub fn timestamp() -> Style {
    Style::default().fg(Color::Rgb(120, 120, 120))
}

/// Style for the status bar background.
#[must_use]
pub fn status_bar_bg() -> Style {
    Style::default().fg(Color::White).bg(Color::Rgb(30, 30, 50))
}

/// Indicator color for a connection state.
#[must_use]
pub const fn state_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Open => SUCCESS,
        ConnectionState::Connecting => WARNING,
        ConnectionState::Closed => ERROR,
        ConnectionState::Disconnected => OFFLINE,
    }
}
