//! Login screen: display name and shared secret.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Flex, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::theme;
use crate::app::{App, LoginField};

/// Render the login form centered in `area`.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let [form] = Layout::horizontal([Constraint::Length(50)])
        .flex(Flex::Center)
        .areas(area);
    let [form] = Layout::vertical([Constraint::Length(11)])
        .flex(Flex::Center)
        .areas(form);

    let block = Block::default()
        .title(" SaltChat ")
        .borders(Borders::ALL)
        .border_style(theme::highlighted());
    let inner = block.inner(form);
    frame.render_widget(block, form);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let masked = "*".repeat(app.login.secret.chars().count());
    render_field(frame, rows[0], "Name", &app.login.name, app.login.focus == LoginField::Name);
    render_field(frame, rows[1], "Secret key", &masked, app.login.focus == LoginField::Secret);

    if let Some(error) = &app.login.error {
        frame.render_widget(
            Paragraph::new(Span::styled(error.as_str(), theme::error())),
            rows[2],
        );
    }
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Enter: join | Tab: switch field | Esc: quit",
            theme::dimmed(),
        )),
        rows[3],
    );
}

fn render_field(frame: &mut Frame, area: Rect, title: &str, value: &str, focused: bool) {
    let mut text = value.to_string();
    if focused {
        text.push('█');
    }
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            theme::highlighted()
        } else {
            theme::normal()
        });
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(text, theme::normal()))).block(block),
        area,
    );
}
