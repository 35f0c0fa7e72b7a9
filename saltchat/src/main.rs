//! `SaltChat` terminal client.
//!
//! Shows a login form, then joins the relay and renders the chat.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/saltchat/config.toml`).
//!
//! ```bash
//! cargo run --bin saltchat -- --server-url ws://127.0.0.1:8000/ws --name ana
//! ```

use std::io;
use std::path::Path;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing_appender::non_blocking::WorkerGuard;

use saltchat::app::{Action, App};
use saltchat::config::{CliArgs, ClientConfig};
use saltchat::net;
use saltchat::ui;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; ratatui owns the terminal.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(server_url = %config.server_url, "saltchat starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("saltchat exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// log lines are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("saltchat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main application loop.
///
/// Runs inside the tokio runtime so `spawn_net` can start the connection
/// task; the loop itself never awaits.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &ClientConfig,
) -> io::Result<()> {
    let mut app = App::new()
        .with_display_name(config.display_name.clone())
        .with_timestamp_format(config.timestamp_format.clone());

    loop {
        terminal.draw(|frame| ui::draw(frame, &app))?;

        app.drain_net_events();

        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if let Some(Action::Connect) = app.handle_key_event(key) {
                connect(&mut app, config);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Open the connection task for a freshly started session.
fn connect(app: &mut App, config: &ClientConfig) {
    match config.to_net_config() {
        Ok(net_config) => {
            tracing::info!(url = %net_config.server_url, "connecting");
            let (cmd_tx, evt_rx) = net::spawn_net(net_config);
            app.attach(cmd_tx, evt_rx);
        }
        Err(e) => {
            tracing::error!(error = %e, "cannot connect");
            if let Some(entry) = app.lifecycle.on_close(Some(&e.to_string())) {
                app.push_entry(entry);
            }
        }
    }
}
