pub mod websocket;

pub use websocket::{ReconnectPolicy, WebSocketRoomTransport};
