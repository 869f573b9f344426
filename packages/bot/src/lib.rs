//! Bot bridging a group-chat service and a real-time room service.
//!
//! Keeps a local mirror of the room state fresh through JSON patches, polls
//! the chat for new messages without reprocessing old ones, and routes
//! recognized commands to handlers.

// layers
pub mod domain;
pub mod infrastructure;
pub mod usecase;

pub mod config;
pub mod runner;
