//! Domain layer: entities, value objects and the ports the use cases rely on.
//!
//! Infrastructure implements the ports (`ChatService`, `RoomTransport`,
//! `StatusStore`, `CommandParser`, `CommandHandler`, `DiagnosticSink`); the
//! domain never depends on infrastructure.

pub mod chat_service;
pub mod command;
pub mod cursor;
pub mod diagnostics;
pub mod event;
pub mod message;
pub mod patch;
pub mod room_socket;
pub mod room_state;
pub mod status_store;
pub mod value_object;

pub use chat_service::{ChatService, ChatServiceError, PrivateFetchQuery, PublicFetchQuery};
pub use command::{
    BotServices, CommandContext, CommandError, CommandHandler, CommandOutcome, CommandParser,
    CommandRegistry, CommandRequest, ParsedCommand, ResponseChannel,
};
pub use cursor::{CursorStore, MessageCursor};
pub use diagnostics::{DiagnosticSink, streams};
pub use event::RoomEvent;
pub use message::ChatMessage;
pub use patch::{PatchError, PatchErrorKind, PatchOperation, apply_patch};
pub use room_socket::{RoomEventSender, RoomSocket, RoomSocketError, RoomTransport};
pub use room_state::{RoomStateStore, StatePatchError};
pub use status_store::{StatusStore, StatusStoreError};
pub use value_object::{MessageId, Timestamp, UserId};

#[cfg(test)]
pub use chat_service::MockChatService;
