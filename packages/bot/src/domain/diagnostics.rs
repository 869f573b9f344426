//! Port to the diagnostic log files.

use async_trait::async_trait;
use serde_json::Value;

/// Logical stream names
pub mod streams {
    pub const STATEFUL_EVENT: &str = "stateful-event";
    pub const STATELESS_EVENT: &str = "stateless-event";
    pub const SERVER_MESSAGE: &str = "server-message";
    pub const SOCKET_ERROR: &str = "socket-error";
}

/// Receives full payloads of room-socket traffic. Never fails.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    async fn record(&self, stream: &str, payload: &Value);
}
