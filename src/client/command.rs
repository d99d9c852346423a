//! Prompt input classification
//!
//! Turns one line typed at the prompt into either chat text or a local
//! command. Rename validation happens here, so an invalid name never
//! reaches the wire.

use crate::error::CommandError;

/// Marker that starts a command
pub const COMMAND_PREFIX: char = '/';

/// Longest display name a client may request, in characters
pub const MAX_NAME_LEN: usize = 20;

/// One classified line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Blank line
    Empty,
    /// Plain chat text
    Chat(String),
    /// Slash command
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/name <new_name>`, already validated
    Rename(String),
    /// `/clear`
    Clear,
    /// `/quit` or `/exit`
    Quit,
}

impl Input {
    /// Classify a raw input line (surrounding whitespace ignored)
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Input::Empty);
        }
        if line.starts_with(COMMAND_PREFIX) {
            return Command::parse(line).map(Input::Command);
        }
        Ok(Input::Chat(line.to_string()))
    }
}

impl Command {
    /// Parse a command line; the command word is case-insensitive
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let (word, arg) = match line.split_once(' ') {
            Some((word, arg)) => (word, Some(arg)),
            None => (line, None),
        };

        match word.to_lowercase().as_str() {
            "/quit" | "/exit" => Ok(Command::Quit),
            "/clear" => Ok(Command::Clear),
            "/name" => {
                let arg = arg.ok_or(CommandError::MissingName)?;
                validate_name(arg.trim()).map(|name| Command::Rename(name.to_string()))
            }
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }
}

/// Accept names of 1 to `MAX_NAME_LEN` characters
pub fn validate_name(name: &str) -> Result<&str, CommandError> {
    let len = name.chars().count();
    if (1..=MAX_NAME_LEN).contains(&len) {
        Ok(name)
    } else {
        Err(CommandError::InvalidName)
    }
}
