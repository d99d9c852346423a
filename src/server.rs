//! ChatServer Actor implementation
//!
//! The central actor that owns the connection registry and performs every
//! fan-out. Connection handlers talk to it through `ServerHandle`, so the
//! registry is only ever touched by one task and needs no locks.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::error::{AppError, SendError};
use crate::message::Envelope;
use crate::peer::PeerEntry;
use crate::registry::Registry;
use crate::types::{default_name, ClientId};

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection accepted
    Connect {
        client_id: ClientId,
        address: SocketAddr,
        sender: mpsc::Sender<Bytes>,
    },
    /// Connection ended (EOF, error or shutdown)
    Disconnect { client_id: ClientId },
    /// Rename request; `None` keeps the current name
    Rename {
        client_id: ClientId,
        name: Option<String>,
    },
    /// Chat text to re-broadcast under the sender's current name
    Chat { client_id: ClientId, message: String },
    /// Point-in-time copy of the registry
    Snapshot {
        reply: oneshot::Sender<Vec<(ClientId, PeerEntry)>>,
    },
    /// Single registry lookup
    Lookup {
        client_id: ClientId,
        reply: oneshot::Sender<Option<PeerEntry>>,
    },
    /// Deregister every peer, then stop
    Shutdown { done: oneshot::Sender<()> },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All connected peers
    registry: Registry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            registry: Registry::new(),
            receiver,
        }
    }

    /// Create the actor, spawn it, and return a handle to it
    pub fn start(buffer: usize) -> (ServerHandle, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(buffer);
        let task = tokio::spawn(ChatServer::new(cmd_rx).run());
        (ServerHandle::new(cmd_tx), task)
    }

    /// Run the ChatServer event loop
    ///
    /// Processes commands until a shutdown request or until all handles
    /// are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            let stop = matches!(cmd, ServerCommand::Shutdown { .. });
            self.handle_command(cmd);
            if stop {
                break;
            }
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect {
                client_id,
                address,
                sender,
            } => self.handle_connect(client_id, address, sender),
            ServerCommand::Disconnect { client_id } => self.disconnect(client_id),
            ServerCommand::Rename { client_id, name } => self.handle_rename(client_id, name),
            ServerCommand::Chat { client_id, message } => self.handle_chat(client_id, message),
            ServerCommand::Snapshot { reply } => {
                let _ = reply.send(self.registry.snapshot());
            }
            ServerCommand::Lookup { client_id, reply } => {
                let _ = reply.send(self.registry.lookup(client_id).cloned());
            }
            ServerCommand::Shutdown { done } => {
                self.handle_shutdown();
                let _ = done.send(());
            }
        }
    }

    /// Register the peer, greet it directly, announce it to everyone else
    fn handle_connect(
        &mut self,
        client_id: ClientId,
        address: SocketAddr,
        sender: mpsc::Sender<Bytes>,
    ) {
        let name = default_name(address.port());
        info!("{} connected from {}", name, address);

        self.registry
            .register(PeerEntry::new(client_id, name.clone(), address, sender));

        let welcome = Envelope::system(format!("Welcome to the chat! Your name is {}", name));
        self.send_to(client_id, &welcome);

        let joined = Envelope::system(format!("{} joined the chat", name));
        self.broadcast(&joined, Some(client_id));

        debug!("Total peers: {}", self.registry.len());
    }

    /// Handle a rename request (applied verbatim, no validation)
    fn handle_rename(&mut self, client_id: ClientId, name: Option<String>) {
        let Some(peer) = self.registry.lookup(client_id) else {
            return;
        };
        let new_name = name.unwrap_or_else(|| peer.name.clone());

        let Some(old_name) = self.registry.rename(client_id, new_name.clone()) else {
            return;
        };
        info!("{} changed their name to {}", old_name, new_name);

        let notice = Envelope::system(format!("{} changed their name to {}", old_name, new_name));
        self.broadcast(&notice, None);
    }

    /// Stamp a chat message with the sender's current name and echo it to all
    fn handle_chat(&mut self, client_id: ClientId, message: String) {
        let Some(peer) = self.registry.lookup(client_id) else {
            return;
        };
        let sender = peer.name.clone();
        info!("{}: {}", sender, message);

        self.broadcast(&Envelope::broadcast_chat(sender, message), None);
    }

    /// Deregister every peer in join order, each leave going to the rest
    fn handle_shutdown(&mut self) {
        info!("Draining {} peers", self.registry.len());
        for (client_id, _) in self.registry.snapshot() {
            self.disconnect(client_id);
        }
    }

    /// Remove a peer and announce its departure. No-op if already gone.
    fn disconnect(&mut self, client_id: ClientId) {
        let Some(peer) = self.registry.unregister(client_id) else {
            return;
        };
        info!("{} ({}) disconnected", peer.name, peer.address);

        let left = Envelope::system(format!("{} left the chat", peer.name));
        self.broadcast(&left, Some(client_id));

        debug!("Total peers: {}", self.registry.len());
    }

    /// Send an envelope to a single peer
    fn send_to(&mut self, client_id: ClientId, envelope: &Envelope) {
        let Some(peer) = self.registry.lookup(client_id) else {
            return;
        };
        let frame = match codec::encode(envelope) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {} envelope: {}", envelope.kind(), e);
                return;
            }
        };

        let result = peer.deliver(frame);
        match result {
            Ok(()) => {}
            Err(SendError::QueueFull) => warn!("Queue full for {}, frame dropped", client_id),
            Err(SendError::ChannelClosed) => self.disconnect(client_id),
        }
    }

    /// Deliver an envelope to every registered peer except `exclude`
    ///
    /// Encodes once. Peers whose connection is gone are collected during
    /// the pass and deregistered only after it completes. Returns the
    /// number of peers the frame was queued for.
    fn broadcast(&mut self, envelope: &Envelope, exclude: Option<ClientId>) -> usize {
        let frame = match codec::encode(envelope) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {} envelope: {}", envelope.kind(), e);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();

        for (client_id, peer) in self.registry.snapshot() {
            if Some(client_id) == exclude {
                continue;
            }
            match peer.deliver(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(SendError::QueueFull) => {
                    warn!("Queue full for {}, frame dropped", peer.name);
                }
                Err(SendError::ChannelClosed) => {
                    debug!("Delivery to {} failed", peer.name);
                    failed.push(client_id);
                }
            }
        }

        for client_id in failed {
            self.disconnect(client_id);
        }

        delivered
    }
}

/// Cloneable handle for talking to the ChatServer actor
#[derive(Debug, Clone)]
pub struct ServerHandle {
    sender: mpsc::Sender<ServerCommand>,
}

impl ServerHandle {
    pub fn new(sender: mpsc::Sender<ServerCommand>) -> Self {
        Self { sender }
    }

    async fn send(&self, cmd: ServerCommand) -> Result<(), AppError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| AppError::ServerClosed)
    }

    pub async fn connect(
        &self,
        client_id: ClientId,
        address: SocketAddr,
        sender: mpsc::Sender<Bytes>,
    ) -> Result<(), AppError> {
        self.send(ServerCommand::Connect {
            client_id,
            address,
            sender,
        })
        .await
    }

    pub async fn disconnect(&self, client_id: ClientId) -> Result<(), AppError> {
        self.send(ServerCommand::Disconnect { client_id }).await
    }

    pub async fn rename(&self, client_id: ClientId, name: Option<String>) -> Result<(), AppError> {
        self.send(ServerCommand::Rename { client_id, name }).await
    }

    pub async fn chat(&self, client_id: ClientId, message: String) -> Result<(), AppError> {
        self.send(ServerCommand::Chat { client_id, message }).await
    }

    pub async fn snapshot(&self) -> Result<Vec<(ClientId, PeerEntry)>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServerCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| AppError::ServerClosed)
    }

    pub async fn lookup(&self, client_id: ClientId) -> Result<Option<PeerEntry>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(ServerCommand::Lookup { client_id, reply }).await?;
        rx.await.map_err(|_| AppError::ServerClosed)
    }

    /// Drain all peers and stop the actor; resolves once draining is done
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let (done, rx) = oneshot::channel();
        self.send(ServerCommand::Shutdown { done }).await?;
        rx.await.map_err(|_| AppError::ServerClosed)
    }
}
