//! Terminal chat client
//!
//! Connects to the relay, renders the incoming stream and sends what the
//! user types.

pub mod command;
pub mod log;
pub mod render;
pub mod session;
pub mod terminal;

pub use command::{Command, Input};
pub use log::MessageLog;
pub use session::{ChatClient, ClientState, Flow, InputHandler, Screen};
pub use terminal::{CursorGuard, TerminalScreen};
