//! Display renderer
//!
//! Pure formatting of envelopes into single display lines. Widths are
//! measured in characters of visible text; color codes are added last.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crossterm::style::{style, Color, Stylize};

use crate::message::Envelope;

/// Colors assigned to other senders
pub const PALETTE: [Color; 6] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
];

const ELLIPSIS: &str = "...";

/// Format an envelope for display
///
/// Returns `None` for envelopes that have no visible form (rename
/// requests never come back from the relay).
pub fn format_envelope(envelope: &Envelope, is_own: bool, width: usize) -> Option<String> {
    match envelope {
        Envelope::System { message, timestamp } => Some(format_system(message, timestamp, width)),
        Envelope::Chat {
            sender,
            message,
            timestamp,
        } => {
            let message = message.replace(['\n', '\r'], " ");
            let timestamp = timestamp.as_deref().unwrap_or_default();
            if is_own {
                Some(format_own(&message, timestamp, width))
            } else {
                let sender = sender.as_deref().unwrap_or("Unknown");
                Some(format_other(sender, &message, timestamp, width))
            }
        }
        Envelope::Rename { .. } => None,
    }
}

/// Stable palette index for a sender name
pub fn name_to_color_index(name: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    (hasher.finish() % PALETTE.len() as u64) as usize
}

/// Pad `text` so it ends one column before the right edge
pub fn right_align(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(char_len(text) + 1);
    format!("{}{}", " ".repeat(pad), text)
}

fn format_system(message: &str, timestamp: &str, width: usize) -> String {
    let line = format!("[SYSTEM] [{}] {}", timestamp, message);
    let len = char_len(&line);
    if len < width {
        let pad = (width - len) / 2;
        format!("{}{}", " ".repeat(pad), line)
    } else {
        truncate(&line, width.saturating_sub(1))
    }
}

fn format_own(message: &str, timestamp: &str, width: usize) -> String {
    let stamp = format!("[{}]", timestamp);
    let content = format!("You: {} {}", message, stamp);
    if char_len(&content) < width.saturating_sub(1) {
        return right_align(&content, width);
    }

    let max_msg = width.saturating_sub("You: ".len() + char_len(&stamp) + 2 + ELLIPSIS.len());
    let content = format!("You: {} {}", shorten(message, max_msg), stamp);
    right_align(&content, width)
}

fn format_other(sender: &str, message: &str, timestamp: &str, width: usize) -> String {
    let color = PALETTE[name_to_color_index(sender)];
    let visible = format!("{}: {} [{}]", sender, message, timestamp);

    let message = if char_len(&visible) > width.saturating_sub(1) {
        let frame = char_len(&format!("{}:  [{}]", sender, timestamp));
        shorten(message, width.saturating_sub(frame + 4))
    } else {
        message.to_string()
    };

    format!("{}: {} [{}]", style(sender).with(color), message, timestamp)
}

/// Cut to `max` characters and mark the cut with an ellipsis
fn shorten(text: &str, max: usize) -> String {
    if char_len(text) > max {
        format!("{}{}", truncate(text, max), ELLIPSIS)
    } else {
        text.to_string()
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
