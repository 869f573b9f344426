//! Adapters for the domain ports: HTTP chat client, websocket room transport,
//! status store, command parsing and the diagnostic log files.

pub mod chat;
pub mod command;
pub mod diagnostic_log;
pub mod dto;
pub mod room_socket;
pub mod status_store;

pub use chat::HttpChatService;
pub use command::{PrefixCommandParser, builtin_registry};
pub use diagnostic_log::{DiagnosticLogger, LogPolicy};
pub use room_socket::{ReconnectPolicy, WebSocketRoomTransport};
pub use status_store::InMemoryStatusStore;
