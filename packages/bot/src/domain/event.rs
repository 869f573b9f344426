//! Notifications pushed by the room socket.

use serde_json::Value;

/// Inbound room-socket notification, in arrival order.
///
/// `raw` keeps the original payload for the diagnostic log.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// A state-carrying event, optionally with a patch batch (still undecoded)
    StateChanged {
        name: String,
        patch: Option<Value>,
        raw: Value,
    },
    /// An event that carries no state
    Stateless { name: String, raw: Value },
    /// An event relayed by the server (`{ message: { name, ... } }`)
    ServerMessage { name: String, raw: Value },
    /// A socket-level error, passed through as received
    SocketError(Value),
    /// The transport reopened the socket after a drop
    Reconnected,
    /// The transport gave up; no further events will arrive
    Closed,
}

impl RoomEvent {
    /// Event name used in logs
    pub fn name(&self) -> &str {
        match self {
            Self::StateChanged { name, .. }
            | Self::Stateless { name, .. }
            | Self::ServerMessage { name, .. } => name,
            Self::SocketError(_) => "error",
            Self::Reconnected => "reconnect",
            Self::Closed => "closed",
        }
    }
}
