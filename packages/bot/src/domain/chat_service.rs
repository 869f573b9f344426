//! Port to the group-chat service.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::{ChatMessage, MessageCursor, MessageId, Timestamp, UserId};

/// Errors reported by a `ChatService` implementation
#[derive(Debug, Error)]
pub enum ChatServiceError {
    /// The request could not be sent or the response not received
    #[error("chat service transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("chat service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded
    #[error("failed to decode chat service response: {0}")]
    Decode(String),
}

/// Query for new public messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFetchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_timestamp: Option<Timestamp>,
    #[serde(rename = "lastID", skip_serializing_if = "Option::is_none")]
    pub last_id: Option<MessageId>,
    /// `false` asks for every message, not only command-prefixed ones
    pub filter_commands: bool,
}

impl PublicFetchQuery {
    /// Unfiltered query starting at `cursor`
    pub fn from_cursor(cursor: &MessageCursor) -> Self {
        Self {
            from_timestamp: cursor.last_timestamp,
            last_id: cursor.last_message_id.clone(),
            filter_commands: false,
        }
    }
}

/// Query for new private messages with one counterpart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateFetchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<Timestamp>,
    pub log_last_message: bool,
    pub return_data: bool,
}

impl PrivateFetchQuery {
    pub fn from_cursor(cursor: Option<&MessageCursor>) -> Self {
        Self {
            last_message_id: cursor.and_then(|c| c.last_message_id.clone()),
            last_timestamp: cursor.and_then(|c| c.last_timestamp),
            log_last_message: false,
            return_data: true,
        }
    }
}

/// Group-chat service as used by the bot
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Join the chat room
    async fn join(&self, room_id: &str) -> Result<(), ChatServiceError>;

    /// Fetch public messages newer than the query's cursor, oldest first
    async fn fetch_messages(
        &self,
        room_id: &str,
        query: &PublicFetchQuery,
    ) -> Result<Vec<ChatMessage>, ChatServiceError>;

    /// Fetch private messages exchanged with `counterpart`, oldest first
    async fn fetch_private_messages(
        &self,
        counterpart: &UserId,
        query: &PrivateFetchQuery,
    ) -> Result<Vec<ChatMessage>, ChatServiceError>;

    /// Post a message to the chat room
    async fn send_message(&self, room_id: &str, text: &str) -> Result<(), ChatServiceError>;

    /// Send a private message to `counterpart`
    async fn send_private_message(
        &self,
        counterpart: &UserId,
        text: &str,
    ) -> Result<(), ChatServiceError>;
}
