//! Real-time TCP Chat Relay Library
//!
//! A minimal chat: a central relay accepts TCP connections, tags each with
//! a display name, and fans out every chat message and presence event
//! (join/leave/rename) to all connected peers. A companion terminal client
//! renders the incoming stream and sends user input back.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the connection registry
//! - Each connection has a `handler` task communicating with the server
//! - No locks needed on the relay - all registry access goes through
//!   message passing
//!
//! Frames are newline-delimited JSON (see [`codec`]).
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use relay_chat::{serve, ChatServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:12345").await.unwrap();
//!     let (server, _actor) = ChatServer::start(256);
//!
//!     serve(listener, server, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//!     .unwrap();
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod peer;
pub mod registry;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use codec::EnvelopeCodec;
pub use config::{ClientConfig, ServerConfig};
pub use error::{AppError, CodecError, CommandError, SendError};
pub use handler::{handle_connection, serve};
pub use message::Envelope;
pub use peer::PeerEntry;
pub use registry::Registry;
pub use server::{ChatServer, ServerCommand, ServerHandle};
pub use types::ClientId;
