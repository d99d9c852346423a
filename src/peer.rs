//! Peer entry definition
//!
//! Represents one connected client as the relay sees it: identity,
//! display name, remote address, and the outbound frame queue.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::types::ClientId;

/// Connected peer information
///
/// The `sender` feeds the connection's writer task with already-encoded
/// frames; once that task is gone the channel reports closed.
#[derive(Debug, Clone)]
pub struct PeerEntry {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Current display name
    pub name: String,
    /// Remote socket address
    pub address: SocketAddr,
    /// Relay → connection frame channel
    pub sender: mpsc::Sender<Bytes>,
}

impl PeerEntry {
    /// Create a new peer entry
    pub fn new(
        id: ClientId,
        name: impl Into<String>,
        address: SocketAddr,
        sender: mpsc::Sender<Bytes>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            address,
            sender,
        }
    }

    /// Queue an encoded frame for this peer without waiting
    ///
    /// A closed channel means the connection is gone; a full one means the
    /// peer is not keeping up and this frame is dropped.
    pub fn deliver(&self, frame: Bytes) -> Result<(), SendError> {
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}
