//! Basic type definitions for the chat relay
//!
//! Provides:
//! - `ClientId`: UUID-based unique connection identifier
//! - default display-name derivation for freshly accepted peers
//! - the server clock used to stamp every broadcast

use uuid::Uuid;

/// Format of every server-assigned timestamp (local time)
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe connection identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default display name for a peer, derived from its remote port
pub fn default_name(port: u16) -> String {
    format!("User_{}", port)
}

/// Current local time as `HH:MM:SS`
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}
