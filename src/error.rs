//! Error types for the chat relay and client
//!
//! Defines application-level errors, wire codec errors, per-peer
//! delivery errors and local command validation errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// All of these are fatal for the connection they occur on.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The relay actor has stopped
    #[error("Server closed")]
    ServerClosed,
}

/// Wire codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Transport error underneath the framing layer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame is not a valid envelope
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame exceeded the maximum line length
    #[error("Frame exceeds {0} bytes")]
    LineTooLong(usize),
}

/// Per-peer delivery errors
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The peer's outbound queue is full; the frame was dropped
    #[error("Queue full")]
    QueueFull,
}

/// Local command errors on the client
///
/// The `Display` text is what the client shows as an inline error entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// `/name` without an argument
    #[error("[ERROR] Usage: /name <new_name>")]
    MissingName,

    /// Name is empty or longer than the allowed maximum
    #[error("[ERROR] Please provide a valid name (1-20 characters)!")]
    InvalidName,

    /// Unrecognized slash command
    #[error("[ERROR] Unknown command: {0}. Available: /name, /clear, /quit")]
    UnknownCommand(String),
}
