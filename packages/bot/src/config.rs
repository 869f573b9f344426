//! Command-line and environment configuration.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use thiserror::Error;

use crate::{
    domain::UserId,
    infrastructure::{LogPolicy, command::parser::DEFAULT_PREFIX},
};

/// Invalid configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required identifier is empty
    #[error("'{0}' must not be empty")]
    Empty(&'static str),

    /// An interval is zero
    #[error("'{0}' must be greater than zero")]
    ZeroInterval(&'static str),
}

#[derive(Parser, Debug, Clone)]
#[command(name = "roomlink-bot")]
#[command(about = "Bot bridging a group chat and a real-time room", long_about = None)]
pub struct BotConfig {
    /// Base URL of the group-chat HTTP API
    #[arg(long, env = "ROOMLINK_CHAT_URL")]
    pub chat_url: String,

    /// Bearer token for the group-chat API
    #[arg(long, env = "ROOMLINK_CHAT_TOKEN", hide_env_values = true)]
    pub chat_token: String,

    /// Chat room to join and poll
    #[arg(long, env = "ROOMLINK_CHAT_ROOM_ID")]
    pub chat_room_id: String,

    /// Websocket URL of the room service
    #[arg(long, env = "ROOMLINK_ROOM_SOCKET_URL")]
    pub room_socket_url: String,

    /// Token sent with the join-room request
    #[arg(long, env = "ROOMLINK_ROOM_TOKEN", hide_env_values = true)]
    pub room_token: String,

    /// Room to join on the room service
    #[arg(long, env = "ROOMLINK_ROOM_UUID")]
    pub room_uuid: String,

    /// The bot's own user id; its messages are never dispatched
    #[arg(long, env = "ROOMLINK_BOT_USER_ID")]
    pub bot_user_id: String,

    #[arg(long, env = "ROOMLINK_POLL_INTERVAL_SECS", default_value_t = 5)]
    pub poll_interval_secs: u64,

    #[arg(long, env = "ROOMLINK_JOIN_TIMEOUT_SECS", default_value_t = 10)]
    pub join_timeout_secs: u64,

    /// Diagnostic log files for room traffic
    #[arg(long, env = "ROOMLINK_DIAGNOSTIC_LOG", value_enum, default_value_t = LogPolicy::Off)]
    pub diagnostic_log: LogPolicy,

    #[arg(long, env = "ROOMLINK_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    #[arg(long, env = "ROOMLINK_COMMAND_PREFIX", default_value = DEFAULT_PREFIX)]
    pub command_prefix: String,

    /// User whose private thread is polled (repeatable)
    #[arg(
        long = "private-counterpart",
        env = "ROOMLINK_PRIVATE_COUNTERPARTS",
        value_delimiter = ','
    )]
    pub private_counterparts: Vec<String>,

    /// Default level for the tracing subscriber; RUST_LOG takes precedence
    #[arg(long, env = "ROOMLINK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl BotConfig {
    /// Check values clap cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("chat-url", &self.chat_url),
            ("chat-token", &self.chat_token),
            ("chat-room-id", &self.chat_room_id),
            ("room-socket-url", &self.room_socket_url),
            ("room-token", &self.room_token),
            ("room-uuid", &self.room_uuid),
            ("bot-user-id", &self.bot_user_id),
            ("command-prefix", &self.command_prefix),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Empty(*name));
        }
        if self
            .private_counterparts
            .iter()
            .any(|id| id.trim().is_empty())
        {
            return Err(ConfigError::Empty("private-counterpart"));
        }

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("poll-interval-secs"));
        }
        if self.join_timeout_secs == 0 {
            return Err(ConfigError::ZeroInterval("join-timeout-secs"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }

    pub fn bot_user(&self) -> UserId {
        UserId::new(self.bot_user_id.trim())
    }

    pub fn counterparts(&self) -> Vec<UserId> {
        self.private_counterparts
            .iter()
            .map(|id| UserId::new(id.trim()))
            .collect()
    }
}
