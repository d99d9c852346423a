//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. A single `Envelope` type
//! crosses the wire in both directions; see the variant docs for which
//! fields each direction carries.

use serde::{Deserialize, Serialize};

use crate::types::timestamp_now;

/// The discriminated message exchanged between relay and clients.
///
/// Wire tags are `system`, `message` and `name_change`; `chat` and
/// `rename` are accepted as aliases on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Server-originated notice (welcome, join, leave, rename)
    System {
        #[serde(default)]
        message: String,
        #[serde(default)]
        timestamp: String,
    },
    /// Chat text.
    ///
    /// Client → server frames carry only `message`; the relay fills in
    /// `sender` and `timestamp` from its own state before fan-out.
    #[serde(rename = "message", alias = "chat")]
    Chat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender: Option<String>,
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Client → server request to change the display name
    #[serde(rename = "name_change", alias = "rename")]
    Rename {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl Envelope {
    /// System notice stamped with the server clock
    pub fn system(message: impl Into<String>) -> Self {
        Envelope::System {
            message: message.into(),
            timestamp: timestamp_now(),
        }
    }

    /// Outbound chat frame as a client sends it (no sender, no timestamp)
    pub fn outbound_chat(message: impl Into<String>) -> Self {
        Envelope::Chat {
            sender: None,
            message: message.into(),
            timestamp: None,
        }
    }

    /// Chat frame as the relay re-broadcasts it
    pub fn broadcast_chat(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Envelope::Chat {
            sender: Some(sender.into()),
            message: message.into(),
            timestamp: Some(timestamp_now()),
        }
    }

    /// Rename request
    pub fn rename(name: impl Into<String>) -> Self {
        Envelope::Rename {
            name: Some(name.into()),
        }
    }

    /// Wire tag of this envelope
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::System { .. } => "system",
            Envelope::Chat { .. } => "message",
            Envelope::Rename { .. } => "name_change",
        }
    }

    /// Whether this is a chat envelope attributed to `name`
    pub fn is_chat_from(&self, name: &str) -> bool {
        matches!(self, Envelope::Chat { sender: Some(s), .. } if s == name)
    }
}
