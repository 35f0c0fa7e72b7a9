//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::App;

/// Render the status bar at the bottom of the chat screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.connection_state();
    let who = app
        .lifecycle
        .session()
        .map_or_else(String::new, |s| format!(" as {}", s.display_name()));

    let status_line = Line::from(vec![
        Span::styled(concat!("SaltChat v", env!("CARGO_PKG_VERSION")), theme::bold()),
        Span::raw(" | "),
        Span::styled("●", theme::normal().fg(theme::state_color(state))),
        Span::raw(format!(" {}{who}", state.label())),
        Span::raw(" | "),
        Span::styled(
            "Enter: send | ↑↓: scroll | Esc: leave | Ctrl+C: quit",
            theme::dimmed(),
        ),
    ]);

    frame.render_widget(Paragraph::new(status_line).style(theme::status_bar_bg()), area);
}
