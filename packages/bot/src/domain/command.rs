//! Chat commands: parsing contract, handler contract and the services handed
//! to handlers.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use super::{ChatMessage, ChatService, RoomStateStore, UserId};

/// Result of parsing one chat text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub is_command: bool,
    pub command: String,
    pub remainder: String,
}

impl ParsedCommand {
    /// Text that is not a command
    pub fn not_a_command() -> Self {
        Self::default()
    }

    pub fn command(command: impl Into<String>, remainder: impl Into<String>) -> Self {
        Self {
            is_command: true,
            command: command.into(),
            remainder: remainder.into(),
        }
    }
}

/// Turns chat text into a `ParsedCommand`; owns the prefix convention
pub trait CommandParser: Send + Sync {
    fn parse(&self, text: &str) -> ParsedCommand;
}

/// Where a reply to a command goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseChannel {
    /// The public chat room
    Public { room_id: String },
    /// The private thread with this user
    Private { counterpart: UserId },
}

/// Who sent a command and in which message
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub sender: Option<UserId>,
    /// Full extracted chat text, prefix included
    pub full_message: String,
    pub chat_message: ChatMessage,
}

/// Collaborators a handler may use for its own side effects
#[derive(Clone)]
pub struct BotServices {
    pub chat: Arc<dyn ChatService>,
    pub room_state: Arc<RoomStateStore>,
    pub chat_room_id: String,
    pub bot_user_id: UserId,
}

/// Everything a handler is invoked with
pub struct CommandRequest<'a> {
    pub command: &'a str,
    pub args: &'a str,
    pub services: &'a BotServices,
    pub context: &'a CommandContext,
    pub response_channel: &'a ResponseChannel,
}

/// What a handler reports back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub response: String,
    pub should_respond: bool,
    pub error: Option<String>,
}

impl CommandOutcome {
    /// Successful outcome that replies with `response`
    pub fn reply(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: response.into(),
            should_respond: true,
            error: None,
        }
    }

    /// Successful outcome without a reply
    pub fn silent() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Failed outcome; the error text is not sent to the chat
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Errors raised by a handler; they abort the rest of the poll tick
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command '{command}' failed: {reason}")]
    Failed { command: String, reason: String },
}

/// A handler for one command name
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, request: CommandRequest<'_>) -> Result<CommandOutcome, CommandError>;
}

/// Dispatch table from command name to handler
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any earlier one
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
