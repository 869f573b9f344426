//! Room websocket frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound frame types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutboundType {
    JoinRoom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    pub room_uuid: String,
}

/// Request to join a room; answered by an `ack` frame with the same `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub r#type: OutboundType,
    pub id: String,
    pub token: String,
    pub payload: JoinRoomPayload,
}

/// Body of a `server-message` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessageBody {
    pub name: String,
}

/// Inbound frames, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundFrame {
    Ack {
        id: String,
        #[serde(default)]
        state: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
    StatefulEvent {
        name: String,
        /// Decoded by the state synchronizer, so a bad operation does not drop the frame
        #[serde(rename = "statePatch", default)]
        state_patch: Option<Value>,
    },
    StatelessEvent {
        name: String,
    },
    ServerMessage {
        message: ServerMessageBody,
    },
    Error {
        #[serde(default)]
        error: Value,
    },
}
