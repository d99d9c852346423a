//! Terminal drawing and cursor management
//!
//! Full-screen redraw of the chat view using the crossterm backend, and a
//! guard that keeps the cursor state scoped to the session.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    terminal::{self, Clear, ClearType},
};

use crate::client::session::{ClientState, Screen};

/// Fallback when the terminal size can't be queried (columns, rows)
pub const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Rows used by header and prompt around the message area
const CHROME_ROWS: usize = 6;

const TITLE: &str = "Relay Chat - Real-time Terminal Chat";
const COMMANDS_HELP: &str = "Commands: /name <new_name>, /clear, /quit";

/// Current terminal size (columns, rows)
pub fn terminal_size() -> (u16, u16) {
    terminal::size()
        .ok()
        .filter(|(cols, rows)| *cols > 0 && *rows > 0)
        .unwrap_or(DEFAULT_SIZE)
}

/// Wipe the screen and home the cursor
pub fn clear_screen() -> io::Result<()> {
    execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))
}

/// Hides the cursor for its lifetime and shows it again on drop
pub struct CursorGuard {
    _private: (),
}

impl CursorGuard {
    pub fn hide() -> io::Result<Self> {
        execute!(io::stdout(), Hide)?;
        Ok(Self { _private: () })
    }

    fn restore() -> io::Result<()> {
        execute!(io::stdout(), Show)
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        if let Err(e) = Self::restore() {
            tracing::error!("Failed to restore cursor: {}", e);
        }
    }
}

/// Screen that redraws the whole terminal on every refresh
#[derive(Debug, Default)]
pub struct TerminalScreen;

impl TerminalScreen {
    pub fn new() -> Self {
        Self
    }

    fn draw(&self, state: &ClientState) -> io::Result<()> {
        let width = state.width();
        let rows = state.height().saturating_sub(CHROME_ROWS).saturating_sub(1);
        let lines = state.recent(rows);
        let username = state.username();

        // Holding the lock keeps concurrent refreshes from interleaving
        let mut out = io::stdout().lock();
        queue!(out, Hide, Clear(ClearType::All), MoveTo(0, 0))?;

        let padding = width.saturating_sub(TITLE.len()) / 2;
        writeln!(out, "{}", "=".repeat(width))?;
        writeln!(out, "{}{}", " ".repeat(padding), TITLE)?;
        writeln!(out, " Status: Connected as: {} | {}", username, COMMANDS_HELP)?;
        writeln!(out, "{}", "=".repeat(width))?;

        for line in &lines {
            writeln!(out, "{}", line)?;
        }
        for _ in lines.len()..rows {
            writeln!(out)?;
        }

        writeln!(out, "{}", "-".repeat(width))?;
        write!(out, "Message: ")?;
        queue!(out, Show)?;
        out.flush()
    }
}

impl Screen for TerminalScreen {
    fn refresh(&self, state: &ClientState) {
        if let Err(e) = self.draw(state) {
            tracing::warn!("Failed to draw screen: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_size_has_fallback() {
        let (cols, rows) = terminal_size();
        assert!(cols > 0 && rows > 0);
    }
}
