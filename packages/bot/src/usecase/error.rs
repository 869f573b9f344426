//! Error types for the use cases.

use std::time::Duration;

use thiserror::Error;

use crate::domain::{ChatServiceError, CommandError, RoomSocketError};

/// Failures of the connect sequence; each one aborts it
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Joining the chat room failed
    #[error("Failed to join chat room '{room_id}': {source}")]
    ChatJoin {
        room_id: String,
        #[source]
        source: ChatServiceError,
    },

    /// The room socket could not be opened
    #[error("Failed to open room socket: {0}")]
    SocketOpen(#[source] RoomSocketError),

    /// The room service refused or dropped the join
    #[error("Failed to join room '{room_uuid}': {source}")]
    RoomJoin {
        room_uuid: String,
        #[source]
        source: RoomSocketError,
    },

    /// The room join did not complete in time
    #[error("Room join timed out after {0:?}")]
    JoinTimeout(Duration),

    /// `disconnect` was called before the sequence finished
    #[error("Disconnected while connecting")]
    Interrupted,
}

impl ConnectError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::JoinTimeout(_))
    }
}

/// Failures that end one poll tick early
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Failed to fetch public messages: {0}")]
    FetchPublic(#[source] ChatServiceError),

    #[error("Failed to fetch private messages from '{counterpart}': {source}")]
    FetchPrivate {
        counterpart: String,
        #[source]
        source: ChatServiceError,
    },

    #[error("Failed to process message '{message_id}': {source}")]
    Dispatch {
        message_id: String,
        #[source]
        source: DispatchError,
    },
}

/// Failures raised by a command handler
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] CommandError),
}
