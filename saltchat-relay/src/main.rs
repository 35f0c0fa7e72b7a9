//! `SaltChat` relay server: broadcasts chat frames between clients.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8000
//! cargo run --bin saltchat-relay
//!
//! # Custom address, senders do not get their own frames back
//! cargo run --bin saltchat-relay -- --bind 127.0.0.1:8080 --no-echo
//! ```

use std::sync::Arc;

use clap::Parser;
use saltchat_relay::config::{RelayCliArgs, RelayConfig};
use saltchat_relay::relay::{self, RelayState};

#[tokio::main]
async fn main() {
    let cli = RelayCliArgs::parse();

    let config = match RelayConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        addr = %config.bind_addr,
        max_frame_size = config.max_frame_size,
        outbound_queue = config.outbound_queue,
        echo = config.echo_to_sender,
        "starting saltchat relay server"
    );

    let state = Arc::new(
        RelayState::with_config(config.max_frame_size, config.echo_to_sender)
            .with_outbound_queue(config.outbound_queue),
    );

    match relay::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "relay server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "relay server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start relay server");
            std::process::exit(1);
        }
    }
}
