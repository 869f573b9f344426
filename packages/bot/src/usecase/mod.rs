//! UseCase layer: connection lifecycle, state synchronization, message
//! polling and command dispatch.

pub mod connect;
pub mod dispatch_command;
pub mod error;
pub mod poll_messages;
pub mod sync_state;

pub use connect::{
    ConnectionManager, ConnectionPhase, ConnectionSettings, ConnectionStatus, DEFAULT_JOIN_TIMEOUT,
    RoomEventReceiver,
};
pub use dispatch_command::{CommandDispatcher, DispatchOutcome};
pub use error::{ConnectError, DispatchError, PollError};
pub use poll_messages::{MessagePoller, TickSummary};
pub use sync_state::{StateSynchronizer, SyncOutcome};
