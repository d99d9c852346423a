//! Chat client - Entry Point
//!
//! Connects to the relay and runs the interactive terminal session.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use relay_chat::client::session::spawn_stdin_reader;
use relay_chat::client::terminal::{clear_screen, terminal_size};
use relay_chat::client::{ChatClient, ClientState, CursorGuard, TerminalScreen};
use relay_chat::ClientConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs would tear the screen, so they stay off unless RUST_LOG asks
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")))
        .init();

    let config = ClientConfig::parse();

    println!("Relay Chat Client v1.0");
    println!("======================");
    println!("Starting client...");

    let stream = match ChatClient::<TerminalScreen>::connect(&config).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("[ERROR] Connection failed: {}", e);
            return Ok(());
        }
    };

    let (cols, rows) = terminal_size();
    let state = Arc::new(ClientState::new(cols as usize, rows as usize));
    let screen = Arc::new(TerminalScreen::new());

    {
        let _cursor = CursorGuard::hide()?;
        ChatClient::new(state, screen)
            .run(stream, spawn_stdin_reader())
            .await;
    }

    clear_screen()?;
    println!("[INFO] Disconnected successfully!");
    println!("Thank you for chatting!");

    Ok(())
}
