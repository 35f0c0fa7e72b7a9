//! Terminal UI rendering.

pub mod chat_panel;
pub mod login;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::{App, Screen};

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    match app.screen {
        Screen::Login => login::render(frame, frame.area(), app),
        Screen::Chat => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(1)])
                .split(frame.area());
            chat_panel::render(frame, chunks[0], app);
            status_bar::render(frame, chunks[1], app);
        }
    }
}
