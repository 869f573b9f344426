//! Port to the real-time room service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use super::RoomEvent;

/// Errors reported by a room socket
#[derive(Debug, Error)]
pub enum RoomSocketError {
    #[error("failed to open room socket: {0}")]
    Connect(String),

    #[error("room socket is closed")]
    Closed,

    /// The service rejected the request
    #[error("room service rejected request: {0}")]
    Rejected(String),

    #[error("room socket protocol error: {0}")]
    Protocol(String),
}

/// Sender half of the inbound event channel
pub type RoomEventSender = mpsc::UnboundedSender<RoomEvent>;

/// An open socket to the room service
#[async_trait]
pub trait RoomSocket: Send + Sync {
    /// Join the room and return its full state.
    ///
    /// Has no timeout of its own; callers bound it.
    async fn join_room(&self, token: &str, room_uuid: &str) -> Result<Value, RoomSocketError>;

    /// Release the socket. Never blocks and may be called repeatedly.
    fn close(&self);
}

/// Factory for room sockets
#[async_trait]
pub trait RoomTransport: Send + Sync {
    /// Open a socket whose inbound notifications are delivered to `events`
    async fn open(&self, events: RoomEventSender) -> Result<Arc<dyn RoomSocket>, RoomSocketError>;
}
