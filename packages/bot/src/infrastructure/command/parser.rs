//! Prefix-based command recognition, e.g. `!ping` or `!echo hello there`.

use crate::domain::{CommandParser, ParsedCommand};

pub const DEFAULT_PREFIX: &str = "!";

/// Recognizes `<prefix><name> <remainder>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixCommandParser {
    prefix: String,
}

impl PrefixCommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PrefixCommandParser {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl CommandParser for PrefixCommandParser {
    fn parse(&self, text: &str) -> ParsedCommand {
        let Some(rest) = text.trim().strip_prefix(self.prefix.as_str()) else {
            return ParsedCommand::not_a_command();
        };

        let (name, remainder) = match rest.split_once(char::is_whitespace) {
            Some((name, remainder)) => (name, remainder.trim()),
            None => (rest, ""),
        };

        // A bare prefix, or prefix followed by whitespace, is ordinary text
        if name.is_empty() {
            return ParsedCommand::not_a_command();
        }

        ParsedCommand::command(name.to_lowercase(), remainder)
    }
}
