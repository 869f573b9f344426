//! Data Transfer Objects for the two remote services.
//!
//! DTOs are organized by protocol:
//! - `chat`: group-chat HTTP API records
//! - `room_socket`: room websocket frames

pub mod chat;
pub mod conversion;
pub mod room_socket;
