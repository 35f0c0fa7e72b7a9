//! Chat panel rendering (message log + input box).

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::theme;
use crate::app::{App, TimedEntry};
use crate::lifecycle::{ChatBody, LogEntry, Origin};

/// Render the chat panel (messages + input box).
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    render_messages(frame, chunks[0], app);
    render_input(frame, chunks[1], app);
}

/// Build the display line for one log entry.
#[must_use]
pub fn entry_line(timed: &TimedEntry) -> Line<'_> {
    let mut spans = vec![
        Span::styled(timed.timestamp.as_str(), theme::timestamp()),
        Span::raw(" "),
    ];
    match &timed.entry {
        LogEntry::System(text) => {
            spans.push(Span::styled(text.as_str(), theme::system_message()));
        }
        LogEntry::Chat {
            sender,
            body,
            origin,
        } => {
            let sender_style = match origin {
                Origin::Own => theme::own_sender(),
                Origin::Peer => theme::normal().fg(theme::sender_color(sender)),
            };
            let body_style = match body {
                ChatBody::Text(_) => theme::normal(),
                ChatBody::Undecryptable(_) => theme::undecryptable(),
            };
            spans.push(Span::styled(sender.as_str(), sender_style));
            spans.push(Span::raw(": "));
            spans.push(Span::styled(body.display(), body_style));
        }
    }
    Line::from(spans)
}

fn render_messages(frame: &mut Frame, area: Rect, app: &App) {
    // Borders take two rows.
    let visible = usize::from(area.height.saturating_sub(2));
    let end = app.log.len().saturating_sub(app.scroll_back);
    let start = end.saturating_sub(visible);

    let items: Vec<ListItem> = app.log[start..end]
        .iter()
        .map(|timed| ListItem::new(entry_line(timed)))
        .collect();

    let title = if app.scroll_back > 0 {
        format!("Chat (-{})", app.scroll_back)
    } else {
        "Chat".to_string()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(theme::normal());

    frame.render_widget(List::new(items).block(block), area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let enabled = app.lifecycle.input_enabled();

    let input_line = if enabled {
        let mut display: String = app.input.clone();
        let index = display
            .char_indices()
            .nth(app.cursor_position)
            .map_or(display.len(), |(i, _)| i);
        display.insert(index, '█');
        Line::from(Span::styled(display, theme::normal()))
    } else if app.input.is_empty() {
        Line::from(Span::styled("Waiting for the connection...", theme::dimmed()))
    } else {
        Line::from(Span::styled(app.input.as_str(), theme::dimmed()))
    };

    let block = Block::default()
        .title("Message")
        .borders(Borders::ALL)
        .border_style(if enabled {
            theme::highlighted()
        } else {
            theme::dimmed()
        });

    frame.render_widget(Paragraph::new(input_line).block(block), area);
}
