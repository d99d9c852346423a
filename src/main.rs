//! Chat relay - Entry Point
//!
//! Starts the TCP listener and ChatServer actor, accepting connections
//! until Ctrl-C, then drains every peer before exiting.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_chat::{serve, ChatServer, ServerConfig};

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=relay_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relay_chat=info")),
        )
        .init();

    let config = ServerConfig::parse();
    let addr = config.bind_addr();

    // Start TCP listener
    let listener = TcpListener::bind(&addr).await?;
    info!("Chat relay listening on {}", addr);

    // Create ChatServer actor and start
    let (server, actor) = ChatServer::start(CHANNEL_BUFFER_SIZE);
    info!("ChatServer actor started");

    serve(listener, server, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    actor.await?;

    Ok(())
}
