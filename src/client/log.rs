//! Client-side message log
//!
//! Append-only list of already formatted display lines. When it grows
//! past `LOG_CAPACITY` it is cut back to the newest `LOG_RETAIN` lines.

/// Entry count that triggers truncation
pub const LOG_CAPACITY: usize = 1000;

/// Entries kept after truncation
pub const LOG_RETAIN: usize = 500;

#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    entries: Vec<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, dropping the oldest ones if over capacity
    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
        if self.entries.len() > LOG_CAPACITY {
            let excess = self.entries.len() - LOG_RETAIN;
            self.entries.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The newest `count` lines, oldest first
    pub fn recent(&self, count: usize) -> &[String] {
        let start = self.entries.len().saturating_sub(count);
        &self.entries[start..]
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
