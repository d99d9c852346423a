//! TCP connection handler
//!
//! Handles individual client connections: registration with the
//! ChatServer, frame decoding, and bidirectional communication. Also hosts
//! the accept loop that spawns one handler per connection.

use std::future::Future;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info};

use crate::codec::EnvelopeCodec;
use crate::error::AppError;
use crate::message::Envelope;
use crate::server::ServerHandle;
use crate::types::ClientId;

/// Outbound frames buffered per connection before the relay starts dropping
pub const PEER_QUEUE_CAPACITY: usize = 256;

/// Accept connections until `shutdown` resolves, then drain all peers
pub async fn serve<F>(listener: TcpListener, server: ServerHandle, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down server...");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let server = server.clone();

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, server).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    server.shutdown().await?;
    drop(listener);
    info!("Server shutdown complete");

    Ok(())
}

/// Handle a new TCP connection
///
/// Registers the peer, then runs a read task (socket -> ServerCommand) and
/// a write task (queued frames -> socket) until either side ends.
pub async fn handle_connection(stream: TcpStream, server: ServerHandle) -> Result<(), AppError> {
    let peer_addr = stream.peer_addr()?;
    let (read_half, mut write_half) = stream.into_split();

    let client_id = ClientId::new();
    debug!("Client {} connected from {}", client_id, peer_addr);

    // Channel for relay -> client frames
    let (frame_tx, mut frame_rx) = mpsc::channel::<Bytes>(PEER_QUEUE_CAPACITY);
    server.connect(client_id, peer_addr, frame_tx).await?;

    let server_read = server.clone();

    // Spawn read task (socket -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        let mut frames = FramedRead::new(read_half, EnvelopeCodec::new());
        while let Some(result) = frames.next().await {
            match result {
                Ok(envelope) => {
                    if dispatch(&server_read, client_id, envelope).await.is_err() {
                        debug!("Server closed, ending read task for {}", client_id);
                        break;
                    }
                }
                Err(e) => {
                    debug!("Read error for {}: {}", client_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (queued frames -> socket)
    let mut write_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if let Err(e) = write_half.write_all(&frame).await {
                debug!("Write failed for {}: {}", client_id, e);
                break;
            }
        }
        let _ = write_half.shutdown().await;
        debug!("Write task ended for {}", client_id);
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
        }
        _ = &mut write_task => {
            // Dropped from the registry or the socket broke; stop reading
            read_task.abort();
            debug!("Write task completed for {}", client_id);
        }
    }

    // Unregistering drops our queue sender, which lets the write task finish
    let _ = server.disconnect(client_id).await;

    debug!("Client {} ({}) closed", client_id, peer_addr);

    Ok(())
}

/// Route one decoded envelope to the ChatServer
async fn dispatch(server: &ServerHandle, client_id: ClientId, envelope: Envelope) -> Result<(), AppError> {
    match envelope {
        Envelope::Rename { name } => server.rename(client_id, name).await,
        // Any client-supplied sender/timestamp is ignored
        Envelope::Chat { message, .. } => server.chat(client_id, message).await,
        Envelope::System { .. } => {
            debug!("Ignoring system envelope from {}", client_id);
            Ok(())
        }
    }
}
